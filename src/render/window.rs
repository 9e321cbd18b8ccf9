use anyhow::Result;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::display::Orientation;
use crate::render::FrameBuffer;

/// minifbを使用したデバッグウィンドウ
pub struct MinifbRenderer {
    window: Window,
    width: usize,
    height: usize,
}

impl MinifbRenderer {
    /// ウィンドウを作成
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        Ok(Self { window, width, height })
    }

    /// ウィンドウが開いているか
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// キーが押された瞬間か（リピートなし）
    pub fn key_pressed(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// フレームバッファを合成してウィンドウに表示
    pub fn present(&mut self, frame: &mut FrameBuffer, orientation: Orientation) -> Result<()> {
        let (w, h) = frame.size();
        if (w, h) != (self.width, self.height) {
            anyhow::bail!("frame buffer is {}x{}, window is {}x{}", w, h, self.width, self.height);
        }
        let pixels = frame.compose(orientation);
        self.window.update_with_buffer(pixels, self.width, self.height)?;
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }
}
