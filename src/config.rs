use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::pose::JointType;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub osc: OscConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// 同時トラッキング最大人数（ボディ配列のサイズ）
    #[serde(default = "default_body_count")]
    pub body_count: usize,
    #[serde(default = "default_color_width")]
    pub color_width: u32,
    #[serde(default = "default_color_height")]
    pub color_height: u32,
    /// カラーカメラの垂直画角（度）
    #[serde(default = "default_fov_v_deg")]
    pub fov_v_deg: f32,
    /// 深度カメラから見たカラーカメラの位置（メートル）
    #[serde(default = "default_color_offset")]
    pub color_offset: [f32; 3],
    /// 深度カメラに対するカラーカメラの回転 [rx, ry, rz]（度, Euler XYZ）
    #[serde(default)]
    pub color_rotation: [f32; 3],
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// 合成センサーが出す人数
    #[serde(default = "default_actors")]
    pub actors: usize,
    /// Nフレームごとにカラーフレームを欠落させる（0=しない）
    #[serde(default)]
    pub color_drop_interval: u64,
    /// Nフレームごとに切断/再接続を繰り返す（0=しない）
    #[serde(default)]
    pub disconnect_after_frames: u64,
}

fn default_body_count() -> usize { 6 }
fn default_color_width() -> u32 { 1920 }
fn default_color_height() -> u32 { 1080 }
fn default_fov_v_deg() -> f32 { 53.8 }
fn default_color_offset() -> [f32; 3] { [-0.052, 0.0, 0.0] }
fn default_fps() -> u32 { 30 }
fn default_actors() -> usize { 1 }

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            body_count: default_body_count(),
            color_width: default_color_width(),
            color_height: default_color_height(),
            fov_v_deg: default_fov_v_deg(),
            color_offset: default_color_offset(),
            color_rotation: [0.0; 3],
            fps: default_fps(),
            actors: default_actors(),
            color_drop_interval: 0,
            disconnect_after_frames: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayConfig {
    /// 起動時に画像を左右反転する
    #[serde(default)]
    pub flipped: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OscConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_osc_targets")]
    pub targets: Vec<String>,
    /// 送信する関節名（空なら全関節）
    #[serde(default)]
    pub joints: Vec<String>,
}

fn default_osc_targets() -> Vec<String> { vec!["127.0.0.1:8000".to_string()] }

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            targets: default_osc_targets(),
            joints: Vec::new(),
        }
    }
}

impl OscConfig {
    /// 関節名を解決する。空なら None（全関節）。
    pub fn joint_filter(&self) -> Result<Option<Vec<JointType>>> {
        if self.joints.is_empty() {
            return Ok(None);
        }
        self.joints
            .iter()
            .map(|name| JointType::from_name(name).with_context(|| format!("unknown joint name: {}", name)))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebugConfig {
    /// デバッグウィンドウを表示する（desktop feature）
    #[serde(default = "default_true")]
    pub view: bool,
    #[serde(default = "default_view_width")]
    pub width: usize,
    #[serde(default = "default_view_height")]
    pub height: usize,
    /// 処理するフレーム数（0=無制限）
    #[serde(default)]
    pub frames: u64,
}

fn default_true() -> bool { true }
fn default_view_width() -> usize { 960 }
fn default_view_height() -> usize { 540 }

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            view: true,
            width: default_view_width(),
            height: default_view_height(),
            frames: 0,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// 読めなければ警告を出してデフォルト設定を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }
}
