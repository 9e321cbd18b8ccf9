//! 深度センサーとの境界。
//!
//! 実デバイスのドライバはこのクレートの外側にある。ここではフレーム取得と
//! 座標変換のトレイトだけを定義する。取得したフレームは値として所有され、
//! `Drop` でネイティブ資源を解放すること。

pub mod calibration;
pub mod synthetic;

use crate::pose::{Body, CameraSpacePoint, ColorSpacePoint};

pub use calibration::PinholeMapper;
pub use synthetic::{SyntheticFrame, SyntheticSensor};

/// 1フレーム分のカラー画像（0x00RRGGBB）
#[derive(Debug, Clone, PartialEq)]
pub struct ColorImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl ColorImage {
    pub fn new(width: usize, height: usize, pixels: Vec<u32>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self { width, height, pixels }
    }

    /// 単色で塗りつぶした画像
    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self::new(width, height, vec![color; width * height])
    }

    /// 範囲外、または `pixels` が足りない場合は None
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height {
            self.pixels.get(y * self.width + x).copied()
        } else {
            None
        }
    }
}

/// 取得済みのカラーフレーム
pub trait ColorFrame {
    /// 表示用の画像にコピーする
    fn to_image(&self) -> ColorImage;
}

/// 取得済みのボディフレーム
pub trait BodyFrame {
    /// 同時トラッキング可能な最大人数
    fn body_count(&self) -> usize;
    /// `bodies` を今フレームのデータで埋める。長さは `body_count()`。
    fn refresh_body_data(&self, bodies: &mut [Option<Body>]);
}

/// フレーム到着イベントが指す、カラーとボディを束ねたフレーム
///
/// 同じ参照から取得したカラーとボディは時間的に揃っている。
/// 取得できなかった場合は `None`（よくあることでエラーではない）。
pub trait MultiSourceFrame {
    type Color: ColorFrame;
    type Body: BodyFrame;

    fn acquire_color_frame(&self) -> Option<Self::Color>;
    fn acquire_body_frame(&self) -> Option<Self::Body>;
}

/// カメラ空間 → カラー空間の変換
pub trait CoordinateMapper {
    fn map_camera_point_to_color_space(&self, point: CameraSpacePoint) -> ColorSpacePoint;
}

impl<M: CoordinateMapper + ?Sized> CoordinateMapper for &M {
    fn map_camera_point_to_color_space(&self, point: CameraSpacePoint) -> ColorSpacePoint {
        (**self).map_camera_point_to_color_space(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_image_pixel_bounds() {
        let mut image = ColorImage::filled(4, 2, 0x112233);
        image.pixels[1 * 4 + 3] = 0xFFFFFF;
        assert_eq!(image.pixel(0, 0), Some(0x112233));
        assert_eq!(image.pixel(3, 1), Some(0xFFFFFF));
        assert_eq!(image.pixel(4, 0), None);
        assert_eq!(image.pixel(0, 2), None);
    }

    #[test]
    fn test_short_pixel_buffer_is_not_indexed() {
        let image = ColorImage {
            width: 4,
            height: 2,
            pixels: vec![0x010101; 5],
        };
        assert_eq!(image.pixel(0, 1), Some(0x010101));
        assert_eq!(image.pixel(1, 1), None);
        assert_eq!(image.pixel(3, 1), None);
    }
}
