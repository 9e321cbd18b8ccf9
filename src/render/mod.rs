pub mod canvas;
pub mod skeleton;
#[cfg(feature = "desktop")]
pub mod window;

use crate::pose::{AlignedJoints, Body};
use crate::sensor::ColorImage;

pub use canvas::{FrameBuffer, SkeletonOverlay};
pub use skeleton::BONES;
#[cfg(feature = "desktop")]
pub use minifb::Key;
#[cfg(feature = "desktop")]
pub use window::MinifbRenderer;

/// 描画先。フレームハンドラに直接渡して使う。
pub trait OverlaySurface {
    /// 前フレームのスケルトンをすべて消す
    fn clear_overlay(&mut self);
    /// トラッキング中の1人を描く。`is_first` はこのフレームで最初の1人。
    fn draw_body(&mut self, body: &Body, joints: &AlignedJoints, is_first: bool);
    fn show_color_frame(&mut self, image: ColorImage);
    /// センサー切断時に画像を消す
    fn clear_color_frame(&mut self);
}

impl<S: OverlaySurface + ?Sized> OverlaySurface for &mut S {
    fn clear_overlay(&mut self) {
        (**self).clear_overlay()
    }

    fn draw_body(&mut self, body: &Body, joints: &AlignedJoints, is_first: bool) {
        (**self).draw_body(body, joints, is_first)
    }

    fn show_color_frame(&mut self, image: ColorImage) {
        (**self).show_color_frame(image)
    }

    fn clear_color_frame(&mut self) {
        (**self).clear_color_frame()
    }
}
