use crate::display::{DisplayModel, SensorStatus};
use crate::pose::Body;
use crate::render::OverlaySurface;
use crate::sensor::CoordinateMapper;
use crate::tracker::projector::JointProjector;
use crate::transmit::BodySink;

/// フレーム内のボディ配列からトラッキング中の人物を描画・送信する
pub struct TrackingDispatcher<M> {
    projector: JointProjector<M>,
}

impl<M: CoordinateMapper> TrackingDispatcher<M> {
    pub fn new(mapper: M) -> Self {
        Self {
            projector: JointProjector::new(mapper),
        }
    }

    pub fn projector(&self) -> &JointProjector<M> {
        &self.projector
    }

    /// トラッキング中の人数を返す。
    ///
    /// 配列順に処理し、最初にトラッキングされた人物だけ `is_first = true`。
    /// 1人でもいれば状態を Tracking にする。いなければ状態は変えない。
    pub fn dispatch<S, T>(
        &self,
        bodies: &[Option<Body>],
        surface: &mut S,
        sink: &mut T,
        display: &DisplayModel,
    ) -> usize
    where
        S: OverlaySurface + ?Sized,
        T: BodySink + ?Sized,
    {
        surface.clear_overlay();

        let mut tracked = 0;
        for body in bodies.iter().flatten().filter(|b| b.is_tracked) {
            let aligned = self.projector.project(&body.joints);
            let is_first = tracked == 0;
            surface.draw_body(body, &aligned, is_first);

            // 送信失敗でフレーム処理は止めない
            if let Err(e) = sink.send_body(body) {
                log::warn!("failed to send body {}: {:#}", body.tracking_id, e);
            }

            tracked += 1;
            display.set_status(SensorStatus::Tracking);
        }
        tracked
    }
}
