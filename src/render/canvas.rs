use crate::display::Orientation;
use crate::pose::{AlignedJoints, Body, TrackingState};
use crate::render::skeleton::{bone_color, BONES, INFERRED_JOINT_COLOR, JOINT_RADIUS, TRACKED_JOINT_COLOR};
use crate::render::OverlaySurface;
use crate::sensor::ColorImage;

/// 画像がないときの背景色
pub const BACKGROUND_COLOR: u32 = 0x000000;

/// オーバーレイ1人分（描画コマンドの保持用）
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonOverlay {
    pub tracking_id: u64,
    pub joints: AlignedJoints,
    pub is_first: bool,
}

/// ソフトウェア描画のレンダーサーフェス
///
/// カラー画像とスケルトンを別レイヤーとして保持し、[`FrameBuffer::compose`]
/// で表示解像度の `u32` バッファに合成する。関節座標はカラー画像の
/// ピクセル座標なので、表示解像度へスケーリングして描画する。
pub struct FrameBuffer {
    width: usize,
    height: usize,
    source_width: usize,
    source_height: usize,
    image: Option<ColorImage>,
    skeletons: Vec<SkeletonOverlay>,
    buffer: Vec<u32>,
    mirror: bool,
}

impl FrameBuffer {
    /// - width, height: 表示解像度
    /// - source_width, source_height: カラー画像の解像度
    pub fn new(width: usize, height: usize, source_width: usize, source_height: usize) -> Self {
        Self {
            width,
            height,
            source_width: source_width.max(1),
            source_height: source_height.max(1),
            image: None,
            skeletons: Vec::new(),
            buffer: vec![BACKGROUND_COLOR; width * height],
            mirror: false,
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn image(&self) -> Option<&ColorImage> {
        self.image.as_ref()
    }

    pub fn skeletons(&self) -> &[SkeletonOverlay] {
        &self.skeletons
    }

    /// レイヤーを合成して表示バッファを返す。Flipped なら左右反転。
    pub fn compose(&mut self, orientation: Orientation) -> &[u32] {
        self.mirror = orientation.is_flipped();
        self.draw_background();

        let skeletons = std::mem::take(&mut self.skeletons);
        for skeleton in &skeletons {
            self.draw_skeleton(skeleton);
        }
        self.skeletons = skeletons;

        &self.buffer
    }

    fn draw_background(&mut self) {
        let Some(image) = self.image.as_ref() else {
            self.buffer.fill(BACKGROUND_COLOR);
            return;
        };

        // 最近傍サンプリング
        for y in 0..self.height {
            let sy = y * image.height / self.height.max(1);
            for x in 0..self.width {
                let sx = x * image.width / self.width.max(1);
                let color = image.pixel(sx, sy).unwrap_or(BACKGROUND_COLOR);
                let dx = if self.mirror { self.width - 1 - x } else { x };
                self.buffer[y * self.width + dx] = color;
            }
        }
    }

    fn draw_skeleton(&mut self, skeleton: &SkeletonOverlay) {
        let color = bone_color(skeleton.is_first);

        // 骨格線: 両端とも描画可能な場合のみ
        for (start, end) in BONES.iter() {
            let (Some(a), Some(b)) = (skeleton.joints.get(start), skeleton.joints.get(end)) else {
                continue;
            };
            if !a.is_drawable() || !b.is_drawable() {
                continue;
            }
            let start = self.to_display(a.position.x, a.position.y);
            let end = self.to_display(b.position.x, b.position.y);
            // 深度が 0 に近い関節は画面外の巨大な座標になるので切り詰める
            if let Some(((x0, y0), (x1, y1))) = self.clip_segment(start, end) {
                self.draw_line(x0, y0, x1, y1, color);
            }
        }

        let margin = JOINT_RADIUS as f64;
        for joint in skeleton.joints.values() {
            let color = match joint.tracking_state {
                TrackingState::Tracked => TRACKED_JOINT_COLOR,
                TrackingState::Inferred => INFERRED_JOINT_COLOR,
                TrackingState::NotTracked => continue,
            };
            let (px, py) = self.to_display(joint.position.x, joint.position.y);
            let visible = px >= -margin
                && px <= self.width as f64 + margin
                && py >= -margin
                && py <= self.height as f64 + margin;
            if visible {
                self.draw_circle(px as i32, py as i32, JOINT_RADIUS, color);
            }
        }
    }

    /// カラー画像座標 → 表示座標
    fn to_display(&self, x: f32, y: f32) -> (f64, f64) {
        let sx = self.width as f64 / self.source_width as f64;
        let sy = self.height as f64 / self.source_height as f64;
        (x as f64 * sx, y as f64 * sy)
    }

    /// 線分を表示領域（1px の余白付き）に切り詰める（Liang-Barsky）
    ///
    /// 領域と交わらない、または座標が有限でなければ None。
    fn clip_segment(&self, start: (f64, f64), end: (f64, f64)) -> Option<((i32, i32), (i32, i32))> {
        let ((x0, y0), (x1, y1)) = (start, end);
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return None;
        }
        let (min_x, min_y) = (-1.0, -1.0);
        let (max_x, max_y) = (self.width as f64, self.height as f64);
        let dx = x1 - x0;
        let dy = y1 - y0;

        let mut t0 = 0.0f64;
        let mut t1 = 1.0f64;
        for (p, q) in [(-dx, x0 - min_x), (dx, max_x - x0), (-dy, y0 - min_y), (dy, max_y - y0)] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }

        let at = |t: f64| ((x0 + t * dx).round() as i32, (y0 + t * dy).round() as i32);
        Some((at(t0), at(t1)))
    }

    /// Bresenhamのアルゴリズムで線を描画
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// 円を描画（塗りつぶし）
    fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// ピクセルをセット（境界チェック・反転付き）
    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            let x = if self.mirror { self.width - 1 - x as usize } else { x as usize };
            self.buffer[y as usize * self.width + x] = color;
        }
    }
}

impl OverlaySurface for FrameBuffer {
    fn clear_overlay(&mut self) {
        self.skeletons.clear();
    }

    fn draw_body(&mut self, body: &Body, joints: &AlignedJoints, is_first: bool) {
        self.skeletons.push(SkeletonOverlay {
            tracking_id: body.tracking_id,
            joints: joints.clone(),
            is_first,
        });
    }

    fn show_color_frame(&mut self, image: ColorImage) {
        self.source_width = image.width.max(1);
        self.source_height = image.height.max(1);
        self.image = Some(image);
    }

    fn clear_color_frame(&mut self) {
        self.image = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{AlignedJoint, ColorSpacePoint, JointType};

    fn single_joint(joint_type: JointType, x: f32, y: f32, state: TrackingState) -> AlignedJoints {
        let mut joints = AlignedJoints::new();
        joints.insert(joint_type, AlignedJoint::new(ColorSpacePoint::new(x, y), state));
        joints
    }

    #[test]
    fn test_background_without_image() {
        let mut fb = FrameBuffer::new(8, 4, 8, 4);
        let pixels = fb.compose(Orientation::Normal);
        assert!(pixels.iter().all(|p| *p == BACKGROUND_COLOR));
    }

    #[test]
    fn test_image_is_downscaled() {
        let mut fb = FrameBuffer::new(2, 2, 4, 4);
        let mut image = ColorImage::filled(4, 4, 0x111111);
        image.pixels[0] = 0xABCDEF; // (0,0)
        fb.show_color_frame(image);

        let pixels = fb.compose(Orientation::Normal).to_vec();
        assert_eq!(pixels[0], 0xABCDEF);
        assert_eq!(pixels[1], 0x111111);
    }

    #[test]
    fn test_flipped_mirrors_horizontally() {
        let mut fb = FrameBuffer::new(4, 1, 4, 1);
        let mut image = ColorImage::filled(4, 1, 0x000001);
        image.pixels[0] = 0xFF0000;
        fb.show_color_frame(image);

        let normal = fb.compose(Orientation::Normal).to_vec();
        assert_eq!(normal[0], 0xFF0000);
        let flipped = fb.compose(Orientation::Flipped).to_vec();
        assert_eq!(flipped[3], 0xFF0000);
        assert_eq!(flipped[0], 0x000001);
    }

    #[test]
    fn test_joint_drawn_at_scaled_position() {
        let mut fb = FrameBuffer::new(100, 100, 200, 200);
        let body = Body::new(1, true);
        fb.draw_body(&body, &single_joint(JointType::Head, 100.0, 60.0, TrackingState::Tracked), true);

        let pixels = fb.compose(Orientation::Normal).to_vec();
        assert_eq!(pixels[30 * 100 + 50], TRACKED_JOINT_COLOR);
    }

    #[test]
    fn test_not_tracked_joint_is_skipped() {
        let mut fb = FrameBuffer::new(10, 10, 10, 10);
        let body = Body::new(1, true);
        fb.draw_body(&body, &single_joint(JointType::Head, 5.0, 5.0, TrackingState::NotTracked), true);

        let pixels = fb.compose(Orientation::Normal);
        assert!(pixels.iter().all(|p| *p == BACKGROUND_COLOR));
    }

    #[test]
    fn test_bone_uses_primary_color() {
        let mut fb = FrameBuffer::new(100, 100, 100, 100);
        let mut joints = single_joint(JointType::Head, 50.0, 10.0, TrackingState::Tracked);
        joints.insert(
            JointType::Neck,
            AlignedJoint::new(ColorSpacePoint::new(50.0, 40.0), TrackingState::Tracked),
        );
        fb.draw_body(&Body::new(1, true), &joints, true);

        let pixels = fb.compose(Orientation::Normal).to_vec();
        // 線の中間（関節の円から離れた位置）
        assert_eq!(pixels[25 * 100 + 50], bone_color(true));
    }

    #[test]
    fn test_far_off_screen_joint_is_clipped() {
        let mut fb = FrameBuffer::new(100, 100, 100, 100);
        let mut joints = single_joint(JointType::Head, 50.0, 10.0, TrackingState::Tracked);
        joints.insert(
            JointType::Neck,
            AlignedJoint::new(ColorSpacePoint::new(-1e12, 1e12), TrackingState::Inferred),
        );
        fb.draw_body(&Body::new(1, true), &joints, true);

        let pixels = fb.compose(Orientation::Normal).to_vec();
        // 画面端までの部分だけ描かれる
        let bone = pixels.iter().filter(|p| **p == bone_color(true)).count();
        assert!(bone > 40 && bone < 100, "bone pixels: {}", bone);
        assert_eq!(pixels[10 * 100 + 50], TRACKED_JOINT_COLOR);
    }

    #[test]
    fn test_bone_entirely_off_screen_is_skipped() {
        let mut fb = FrameBuffer::new(10, 10, 10, 10);
        let mut joints = single_joint(JointType::Head, -1e12, -5.0, TrackingState::Tracked);
        joints.insert(
            JointType::Neck,
            AlignedJoint::new(ColorSpacePoint::new(1e12, -5.0), TrackingState::Tracked),
        );
        fb.draw_body(&Body::new(1, true), &joints, true);

        let pixels = fb.compose(Orientation::Normal);
        assert!(pixels.iter().all(|p| *p == BACKGROUND_COLOR));
    }

    #[test]
    fn test_clear_overlay_and_image() {
        let mut fb = FrameBuffer::new(4, 4, 4, 4);
        fb.show_color_frame(ColorImage::filled(4, 4, 0x222222));
        fb.draw_body(&Body::new(1, true), &AlignedJoints::new(), false);
        assert_eq!(fb.skeletons().len(), 1);

        fb.clear_overlay();
        fb.clear_color_frame();
        assert!(fb.skeletons().is_empty());
        assert!(fb.image().is_none());
    }
}
