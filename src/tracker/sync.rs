use std::sync::Arc;

use crate::display::{DisplayModel, SensorStatus};
use crate::pose::Body;
use crate::render::OverlaySurface;
use crate::sensor::{BodyFrame, ColorFrame, CoordinateMapper, MultiSourceFrame};
use crate::tracker::dispatch::TrackingDispatcher;
use crate::transmit::BodySink;

/// 1フレーム（tick）の処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// カラーフレームが取れなかった。何も変更していない。
    NoColorFrame,
    /// カラー画像は表示したが、ボディフレームが取れなかった
    NoBodyFrame,
    Processed { tracked: usize },
}

/// 診断用の累計カウンタ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: u64,
    pub color_misses: u64,
    pub body_misses: u64,
    pub tracked_bodies: u64,
}

/// フレーム到着ごとにカラーとボディを取得し、描画・送信まで行うハンドラ
///
/// 描画先・送信先・座標変換は生成時に直接渡す。フレームはこの tick の間だけ
/// 所有し、スコープを抜けた時点で解放される（早期リターンでも同じ）。
pub struct FrameHandler<M, S, T> {
    dispatcher: TrackingDispatcher<M>,
    surface: S,
    sink: T,
    display: Arc<DisplayModel>,
    stats: TickStats,
}

impl<M, S, T> FrameHandler<M, S, T>
where
    M: CoordinateMapper,
    S: OverlaySurface,
    T: BodySink,
{
    pub fn new(mapper: M, surface: S, sink: T, display: Arc<DisplayModel>) -> Self {
        Self {
            dispatcher: TrackingDispatcher::new(mapper),
            surface,
            sink,
            display,
            stats: TickStats::default(),
        }
    }

    pub fn display(&self) -> &Arc<DisplayModel> {
        &self.display
    }

    pub fn mapper(&self) -> &M {
        self.dispatcher.projector().mapper()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn sink(&self) -> &T {
        &self.sink
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    /// フレーム到着イベント
    pub fn on_frame_arrived<F: MultiSourceFrame>(&mut self, frame: &F) -> TickOutcome {
        self.stats.ticks += 1;
        let outcome = self.process(frame);
        match outcome {
            TickOutcome::NoColorFrame => self.stats.color_misses += 1,
            TickOutcome::NoBodyFrame => self.stats.body_misses += 1,
            TickOutcome::Processed { tracked } => self.stats.tracked_bodies += tracked as u64,
        }
        log::trace!("tick {}: {:?}", self.stats.ticks, outcome);
        outcome
    }

    fn process<F: MultiSourceFrame>(&mut self, frame: &F) -> TickOutcome {
        // カラー画像（このブロックを抜けるとカラーフレームは解放される）
        {
            let Some(color) = frame.acquire_color_frame() else {
                return TickOutcome::NoColorFrame;
            };
            // フレームが取れた = センサー稼働中
            self.display.set_status(SensorStatus::Idle);
            self.surface.show_color_frame(color.to_image());
        }

        // 同じ参照から取るのでカラーと時刻が揃う
        let bodies = {
            let Some(body_frame) = frame.acquire_body_frame() else {
                return TickOutcome::NoBodyFrame;
            };
            let mut bodies: Vec<Option<Body>> = vec![None; body_frame.body_count()];
            body_frame.refresh_body_data(&mut bodies);
            bodies
        };

        let tracked = self
            .dispatcher
            .dispatch(&bodies, &mut self.surface, &mut self.sink, &self.display);
        TickOutcome::Processed { tracked }
    }

    /// センサー接続状態の変化。接続・切断どちらでも NoSignal に戻し画像を消す。
    ///
    /// 次にカラーフレームが取れた時点で Idle に戻る。
    pub fn on_availability_changed(&mut self, available: bool) {
        log::info!("sensor {}", if available { "available" } else { "unavailable" });
        self.display.set_status(SensorStatus::NoSignal);
        self.surface.clear_color_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{AlignedJoints, CameraSpacePoint, ColorSpacePoint, JointType, TrackingState};
    use crate::sensor::{ColorImage, SyntheticFrame};
    use crate::transmit::NoopSink;

    struct IdentityMapper;

    impl CoordinateMapper for IdentityMapper {
        fn map_camera_point_to_color_space(&self, p: CameraSpacePoint) -> ColorSpacePoint {
            ColorSpacePoint::new(p.x, p.y)
        }
    }

    /// 呼び出し順を記録する
    #[derive(Default)]
    struct CallLog {
        calls: Vec<&'static str>,
    }

    impl OverlaySurface for CallLog {
        fn clear_overlay(&mut self) {
            self.calls.push("clear_overlay");
        }

        fn draw_body(&mut self, _body: &Body, _joints: &AlignedJoints, _is_first: bool) {
            self.calls.push("draw_body");
        }

        fn show_color_frame(&mut self, _image: ColorImage) {
            self.calls.push("show_color_frame");
        }

        fn clear_color_frame(&mut self) {
            self.calls.push("clear_color_frame");
        }
    }

    fn handler() -> FrameHandler<IdentityMapper, CallLog, NoopSink> {
        FrameHandler::new(IdentityMapper, CallLog::default(), NoopSink, Arc::new(DisplayModel::default()))
    }

    fn tracked_body() -> Option<Body> {
        Some(Body::new(1, true).with_joint(
            JointType::Head,
            CameraSpacePoint::new(0.0, 0.5, 2.0),
            TrackingState::Tracked,
        ))
    }

    #[test]
    fn test_missing_color_frame_is_a_no_op() {
        let mut h = handler();
        let frame = SyntheticFrame::new(None, Some(vec![tracked_body()]));

        assert_eq!(h.on_frame_arrived(&frame), TickOutcome::NoColorFrame);
        assert!(h.surface().calls.is_empty());
        assert_eq!(h.display().status(), SensorStatus::NoSignal);
        assert_eq!(frame.outstanding(), 0);
    }

    #[test]
    fn test_missing_body_frame_after_color() {
        let mut h = handler();
        let frame = SyntheticFrame::new(Some(ColorImage::filled(2, 2, 0)), None);

        assert_eq!(h.on_frame_arrived(&frame), TickOutcome::NoBodyFrame);
        assert_eq!(h.surface().calls, vec!["show_color_frame"]);
        assert_eq!(h.display().status(), SensorStatus::Idle);
        assert_eq!(frame.outstanding(), 0);
    }

    #[test]
    fn test_full_tick_call_order() {
        let mut h = handler();
        let frame = SyntheticFrame::new(
            Some(ColorImage::filled(2, 2, 0)),
            Some(vec![None, tracked_body()]),
        );

        assert_eq!(h.on_frame_arrived(&frame), TickOutcome::Processed { tracked: 1 });
        assert_eq!(h.surface().calls, vec!["show_color_frame", "clear_overlay", "draw_body"]);
        assert_eq!(h.display().status(), SensorStatus::Tracking);
        assert_eq!(frame.outstanding(), 0);
    }

    #[test]
    fn test_availability_resets_to_no_signal() {
        let mut h = handler();
        let frame = SyntheticFrame::new(Some(ColorImage::filled(2, 2, 0)), Some(vec![tracked_body()]));
        h.on_frame_arrived(&frame);
        assert_eq!(h.display().status(), SensorStatus::Tracking);

        h.on_availability_changed(false);
        assert_eq!(h.display().status(), SensorStatus::NoSignal);
        assert_eq!(h.surface().calls.last(), Some(&"clear_color_frame"));

        // 次のフレームで復帰する
        let frame = SyntheticFrame::new(Some(ColorImage::filled(2, 2, 0)), Some(vec![None]));
        h.on_frame_arrived(&frame);
        assert_eq!(h.display().status(), SensorStatus::Idle);
    }

    #[test]
    fn test_status_regresses_to_idle_on_next_tick() {
        let mut h = handler();
        let tracked = SyntheticFrame::new(Some(ColorImage::filled(2, 2, 0)), Some(vec![tracked_body()]));
        let empty = SyntheticFrame::new(Some(ColorImage::filled(2, 2, 0)), Some(vec![None]));

        h.on_frame_arrived(&tracked);
        assert_eq!(h.display().status(), SensorStatus::Tracking);
        h.on_frame_arrived(&empty);
        assert_eq!(h.display().status(), SensorStatus::Idle);
    }

    #[test]
    fn test_stats() {
        let mut h = handler();
        h.on_frame_arrived(&SyntheticFrame::new(None, None));
        h.on_frame_arrived(&SyntheticFrame::new(Some(ColorImage::filled(1, 1, 0)), None));
        h.on_frame_arrived(&SyntheticFrame::new(
            Some(ColorImage::filled(1, 1, 0)),
            Some(vec![tracked_body(), tracked_body()]),
        ));

        assert_eq!(
            h.stats(),
            TickStats {
                ticks: 3,
                color_misses: 1,
                body_misses: 1,
                tracked_bodies: 2,
            }
        );
    }
}
