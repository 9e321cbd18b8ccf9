use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::SensorConfig;
use crate::pose::{Body, CameraSpacePoint, JointType, TrackingState};
use crate::sensor::{BodyFrame, ColorFrame, ColorImage, MultiSourceFrame};

/// 直立姿勢の関節オフセット（SpineBase 基準, メートル）
const STANDING_POSE: [(JointType, [f32; 3]); JointType::COUNT] = [
    (JointType::SpineBase, [0.0, 0.0, 0.0]),
    (JointType::SpineMid, [0.0, 0.3, 0.0]),
    (JointType::Neck, [0.0, 0.55, 0.0]),
    (JointType::Head, [0.0, 0.7, 0.0]),
    (JointType::ShoulderLeft, [-0.18, 0.48, 0.0]),
    (JointType::ElbowLeft, [-0.25, 0.22, 0.0]),
    (JointType::WristLeft, [-0.28, 0.0, 0.0]),
    (JointType::HandLeft, [-0.29, -0.07, 0.0]),
    (JointType::ShoulderRight, [0.18, 0.48, 0.0]),
    (JointType::ElbowRight, [0.25, 0.22, 0.0]),
    (JointType::WristRight, [0.28, 0.0, 0.0]),
    (JointType::HandRight, [0.29, -0.07, 0.0]),
    (JointType::HipLeft, [-0.09, -0.02, 0.0]),
    (JointType::KneeLeft, [-0.1, -0.45, 0.0]),
    (JointType::AnkleLeft, [-0.1, -0.85, 0.0]),
    (JointType::FootLeft, [-0.1, -0.9, -0.1]),
    (JointType::HipRight, [0.09, -0.02, 0.0]),
    (JointType::KneeRight, [0.1, -0.45, 0.0]),
    (JointType::AnkleRight, [0.1, -0.85, 0.0]),
    (JointType::FootRight, [0.1, -0.9, -0.1]),
    (JointType::SpineShoulder, [0.0, 0.5, 0.0]),
    (JointType::HandTipLeft, [-0.3, -0.15, 0.0]),
    (JointType::ThumbLeft, [-0.25, -0.08, -0.03]),
    (JointType::HandTipRight, [0.3, -0.15, 0.0]),
    (JointType::ThumbRight, [0.25, -0.08, -0.03]),
];

/// 推定関節の深度が負になるフレーム間隔
const NEGATIVE_DEPTH_INTERVAL: u64 = 50;

/// 実機の代わりにフレームを生成するセンサー
///
/// 出力は `frame_index` だけで決まる（乱数なし）。
pub struct SyntheticSensor {
    config: SensorConfig,
    frame_index: u64,
    background: Arc<ColorImage>,
    outstanding: Arc<AtomicUsize>,
    reported_available: Option<bool>,
}

impl SyntheticSensor {
    pub fn from_config(config: &SensorConfig) -> Self {
        Self {
            config: config.clone(),
            frame_index: 0,
            background: Arc::new(gradient(config.color_width as usize, config.color_height as usize)),
            outstanding: Arc::new(AtomicUsize::new(0)),
            reported_available: None,
        }
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// 未解放のフレーム数
    pub fn outstanding_frames(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// `disconnect_after_frames` ごとに切断と再接続を繰り返す
    pub fn is_available(&self) -> bool {
        self.is_available_at(self.frame_index)
    }

    /// 前回の報告から接続状態が変わっていれば返す（初回は必ず返す）
    pub fn poll_availability(&mut self) -> Option<bool> {
        let available = self.is_available();
        if self.reported_available == Some(available) {
            return None;
        }
        self.reported_available = Some(available);
        Some(available)
    }

    /// 次のフレームを生成する
    pub fn next_frame(&mut self) -> SyntheticFrame {
        let index = self.frame_index;
        self.frame_index += 1;

        if !self.is_available_at(index) {
            return SyntheticFrame::empty(Arc::clone(&self.outstanding));
        }

        let drop_color = self.config.color_drop_interval > 0
            && index % self.config.color_drop_interval == self.config.color_drop_interval - 1;
        let color = (!drop_color).then(|| Arc::clone(&self.background));

        let mut bodies: Vec<Option<Body>> = vec![None; self.config.body_count];
        for actor in 0..self.config.actors.min(self.config.body_count) {
            bodies[actor] = Some(self.actor_body(actor, index));
        }
        // 残りのスロットは未トラッキング
        for slot in bodies.iter_mut().filter(|b| b.is_none()) {
            *slot = Some(Body::untracked());
        }

        SyntheticFrame {
            color,
            bodies: Some(Arc::new(bodies)),
            body_count: self.config.body_count,
            outstanding: Arc::clone(&self.outstanding),
        }
    }

    fn is_available_at(&self, index: u64) -> bool {
        match self.config.disconnect_after_frames {
            0 => true,
            n => (index / n) % 2 == 0,
        }
    }

    fn actor_body(&self, actor: usize, index: u64) -> Body {
        let t = index as f32 / self.config.fps.max(1) as f32;
        let phase = actor as f32 * 1.3;
        let spread = self.config.actors.max(1) as f32;
        let base_x = (actor as f32 + 0.5) / spread * 1.6 - 0.8 + 0.2 * (0.5 * t + phase).sin();
        let base_z = 2.5 + 0.3 * (0.3 * t + phase).cos();
        let wave = 0.15 * (2.0 * t + phase).sin();

        let mut body = Body::new(1000 + actor as u64, true);
        for (joint_type, [dx, dy, dz]) in STANDING_POSE {
            let lift = match joint_type {
                JointType::WristRight
                | JointType::HandRight
                | JointType::HandTipRight
                | JointType::ThumbRight => wave,
                _ => 0.0,
            };
            let position = CameraSpacePoint::new(base_x + dx, dy + lift, base_z + dz);
            let state = match joint_type {
                JointType::FootLeft | JointType::FootRight => TrackingState::Inferred,
                _ => TrackingState::Tracked,
            };
            body.set_joint(joint_type, position, state);
        }

        // 推定関節の深度が負になるケースを定期的に混ぜる
        if index % NEGATIVE_DEPTH_INTERVAL == NEGATIVE_DEPTH_INTERVAL - 1 {
            if let Some(tip) = body.joint(JointType::HandTipLeft).copied() {
                let position = CameraSpacePoint::new(tip.position.x, tip.position.y, -0.2);
                body.set_joint(JointType::HandTipLeft, position, TrackingState::Inferred);
            }
        }
        body
    }
}

/// 生成されたマルチソースフレーム
pub struct SyntheticFrame {
    color: Option<Arc<ColorImage>>,
    bodies: Option<Arc<Vec<Option<Body>>>>,
    body_count: usize,
    outstanding: Arc<AtomicUsize>,
}

impl SyntheticFrame {
    /// 任意のカラー画像・ボディ配列からフレームを作る（どちらも欠落可）
    pub fn new(color: Option<ColorImage>, bodies: Option<Vec<Option<Body>>>) -> Self {
        let body_count = bodies.as_ref().map_or(0, Vec::len);
        Self {
            color: color.map(Arc::new),
            bodies: bodies.map(Arc::new),
            body_count,
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn empty(outstanding: Arc<AtomicUsize>) -> Self {
        Self {
            color: None,
            bodies: None,
            body_count: 0,
            outstanding,
        }
    }

    /// このフレームから取得され、まだ解放されていないサブフレーム数
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}

impl MultiSourceFrame for SyntheticFrame {
    type Color = SyntheticColorFrame;
    type Body = SyntheticBodyFrame;

    fn acquire_color_frame(&self) -> Option<SyntheticColorFrame> {
        let image = self.color.as_ref()?;
        Some(SyntheticColorFrame {
            image: Arc::clone(image),
            _guard: FrameGuard::acquire(&self.outstanding),
        })
    }

    fn acquire_body_frame(&self) -> Option<SyntheticBodyFrame> {
        let bodies = self.bodies.as_ref()?;
        Some(SyntheticBodyFrame {
            bodies: Arc::clone(bodies),
            body_count: self.body_count,
            _guard: FrameGuard::acquire(&self.outstanding),
        })
    }
}

/// 取得中のフレーム数を数える。Drop で解放扱いになる。
struct FrameGuard {
    outstanding: Arc<AtomicUsize>,
}

impl FrameGuard {
    fn acquire(outstanding: &Arc<AtomicUsize>) -> Self {
        outstanding.fetch_add(1, Ordering::AcqRel);
        Self {
            outstanding: Arc::clone(outstanding),
        }
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct SyntheticColorFrame {
    image: Arc<ColorImage>,
    _guard: FrameGuard,
}

impl ColorFrame for SyntheticColorFrame {
    fn to_image(&self) -> ColorImage {
        (*self.image).clone()
    }
}

pub struct SyntheticBodyFrame {
    bodies: Arc<Vec<Option<Body>>>,
    body_count: usize,
    _guard: FrameGuard,
}

impl BodyFrame for SyntheticBodyFrame {
    fn body_count(&self) -> usize {
        self.body_count
    }

    fn refresh_body_data(&self, bodies: &mut [Option<Body>]) {
        for (slot, body) in bodies.iter_mut().zip(self.bodies.iter()) {
            *slot = body.clone();
        }
    }
}

/// 背景用の縦グラデーション
fn gradient(width: usize, height: usize) -> ColorImage {
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        let shade = (0x20 + y * 0x40 / height.max(1)) as u32;
        let color = (shade << 16) | (shade << 8) | (shade + 0x10).min(0xFF);
        pixels.extend(std::iter::repeat(color).take(width));
    }
    ColorImage::new(width, height, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SensorConfig {
        SensorConfig {
            color_width: 64,
            color_height: 36,
            actors: 2,
            ..SensorConfig::default()
        }
    }

    #[test]
    fn test_frame_has_body_count_slots() {
        let mut sensor = SyntheticSensor::from_config(&config());
        let frame = sensor.next_frame();
        let body_frame = frame.acquire_body_frame().unwrap();
        assert_eq!(body_frame.body_count(), 6);

        let mut bodies = vec![None; body_frame.body_count()];
        body_frame.refresh_body_data(&mut bodies);
        let tracked = bodies.iter().flatten().filter(|b| b.is_tracked).count();
        assert_eq!(tracked, 2);
        let first = bodies[0].as_ref().unwrap();
        assert_eq!(first.joints.len(), JointType::COUNT);
    }

    #[test]
    fn test_guards_count_outstanding_frames() {
        let mut sensor = SyntheticSensor::from_config(&config());
        let frame = sensor.next_frame();
        {
            let _color = frame.acquire_color_frame().unwrap();
            let _body = frame.acquire_body_frame().unwrap();
            assert_eq!(sensor.outstanding_frames(), 2);
        }
        assert_eq!(sensor.outstanding_frames(), 0);
    }

    #[test]
    fn test_color_drop_interval() {
        let mut sensor = SyntheticSensor::from_config(&SensorConfig {
            color_drop_interval: 3,
            ..config()
        });
        let missing: Vec<bool> = (0..6)
            .map(|_| sensor.next_frame().acquire_color_frame().is_none())
            .collect();
        assert_eq!(missing, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn test_disconnect_cycle() {
        let mut sensor = SyntheticSensor::from_config(&SensorConfig {
            disconnect_after_frames: 2,
            ..config()
        });
        assert_eq!(sensor.poll_availability(), Some(true));
        assert_eq!(sensor.poll_availability(), None);

        sensor.next_frame();
        sensor.next_frame();
        assert_eq!(sensor.poll_availability(), Some(false));
        // 切断中のフレームは何も取得できない
        let frame = sensor.next_frame();
        assert!(frame.acquire_color_frame().is_none());
        assert!(frame.acquire_body_frame().is_none());

        sensor.next_frame();
        assert_eq!(sensor.poll_availability(), Some(true));
    }

    #[test]
    fn test_negative_depth_is_injected_periodically() {
        let mut sensor = SyntheticSensor::from_config(&config());
        let frame = (0..NEGATIVE_DEPTH_INTERVAL).map(|_| sensor.next_frame()).last().unwrap();
        let body_frame = frame.acquire_body_frame().unwrap();
        let mut bodies = vec![None; body_frame.body_count()];
        body_frame.refresh_body_data(&mut bodies);

        let tip = bodies[0].as_ref().unwrap().joint(JointType::HandTipLeft).unwrap();
        assert!(tip.position.z < 0.0);
        assert_eq!(tip.tracking_state, TrackingState::Inferred);
    }

    #[test]
    fn test_explicit_frame_without_color() {
        let frame = SyntheticFrame::new(None, Some(vec![None, None]));
        assert!(frame.acquire_color_frame().is_none());
        assert_eq!(frame.acquire_body_frame().unwrap().body_count(), 2);
    }
}
