use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kicass::config::Config;
use kicass::display::{DisplayChange, DisplayModel, Orientation};
use kicass::render::FrameBuffer;
use kicass::sensor::{PinholeMapper, SyntheticSensor};
use kicass::tracker::FrameHandler;
use kicass::transmit::OscSender;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path);
    let sensor_config = &config.sensor;

    println!("KiCASS {}", env!("KICASS_BUILD_VERSION"));
    println!("Config: {}", config_path);
    println!(
        "Sensor: {}x{} @ {}fps, bodies={}, actors={}",
        sensor_config.color_width,
        sensor_config.color_height,
        sensor_config.fps,
        sensor_config.body_count,
        sensor_config.actors
    );
    println!(
        "OSC: {}",
        if config.osc.enabled { config.osc.targets.join(", ") } else { "OFF".to_string() }
    );
    println!("Debug view: {}", if config.debug.view { "ON" } else { "OFF" });
    println!();
    println!("操作: [F] 左右反転  [Esc] 終了");
    println!();

    let orientation = if config.display.flipped { Orientation::Flipped } else { Orientation::Normal };
    let display = DisplayModel::shared(orientation);
    display.subscribe(|change| {
        if let DisplayChange::Presentation { index, asset } = change {
            log::info!("status icon [{}] {}", index, asset);
        }
    });

    let mapper = PinholeMapper::from_config(
        sensor_config.fov_v_deg,
        sensor_config.color_width,
        sensor_config.color_height,
        sensor_config.color_offset,
        sensor_config.color_rotation,
    );
    let surface = FrameBuffer::new(
        config.debug.width,
        config.debug.height,
        sensor_config.color_width as usize,
        sensor_config.color_height as usize,
    );
    let sink = if config.osc.enabled {
        Some(OscSender::from_config(&config.osc)?)
    } else {
        None
    };

    let mut handler = FrameHandler::new(mapper, surface, sink, Arc::clone(&display));
    let mut sensor = SyntheticSensor::from_config(sensor_config);
    let mut viewer = Viewer::new(&config)?;

    let frame_duration = Duration::from_secs_f64(1.0 / sensor_config.fps.max(1) as f64);
    let mut fps_timer = Instant::now();
    let mut last_ticks = 0u64;

    loop {
        let loop_start = Instant::now();

        if config.debug.frames > 0 && sensor.frame_index() >= config.debug.frames {
            break;
        }

        if let Some(available) = sensor.poll_availability() {
            handler.on_availability_changed(available);
        }
        let frame = sensor.next_frame();
        handler.on_frame_arrived(&frame);
        drop(frame);

        if !viewer.update(handler.surface_mut(), &display)? {
            break;
        }

        if fps_timer.elapsed() >= Duration::from_secs(1) {
            let stats = handler.stats();
            eprintln!(
                "FPS: {} | {:?} | tracked: {} | color misses: {}",
                stats.ticks - last_ticks,
                display.status(),
                stats.tracked_bodies,
                stats.color_misses
            );
            last_ticks = stats.ticks;
            fps_timer = Instant::now();
        }

        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }

    let stats = handler.stats();
    println!(
        "終了: ticks={}, color misses={}, body misses={}, tracked bodies={}",
        stats.ticks, stats.color_misses, stats.body_misses, stats.tracked_bodies
    );
    Ok(())
}

/// デバッグウィンドウ（desktop feature のみ）
#[cfg(feature = "desktop")]
struct Viewer {
    renderer: Option<kicass::render::MinifbRenderer>,
}

#[cfg(feature = "desktop")]
impl Viewer {
    fn new(config: &Config) -> Result<Self> {
        let renderer = if config.debug.view {
            Some(kicass::render::MinifbRenderer::new(
                "KiCASS",
                config.debug.width,
                config.debug.height,
            )?)
        } else {
            None
        };
        Ok(Self { renderer })
    }

    /// ウィンドウが閉じられたら false
    fn update(&mut self, surface: &mut FrameBuffer, display: &DisplayModel) -> Result<bool> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(true);
        };
        if !renderer.is_open() {
            return Ok(false);
        }
        if renderer.key_pressed(kicass::render::Key::F) {
            display.toggle_orientation();
        }
        let state = display.snapshot();
        renderer.set_title(&format!("KiCASS - {:?}", state.status()));
        renderer.present(surface, state.orientation())?;
        Ok(true)
    }
}

#[cfg(not(feature = "desktop"))]
struct Viewer;

#[cfg(not(feature = "desktop"))]
impl Viewer {
    fn new(config: &Config) -> Result<Self> {
        if config.debug.view {
            log::warn!("debug view requires the `desktop` feature; running headless");
        }
        Ok(Self)
    }

    fn update(&mut self, _surface: &mut FrameBuffer, _display: &DisplayModel) -> Result<bool> {
        Ok(true)
    }
}
