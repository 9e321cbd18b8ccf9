use std::collections::BTreeMap;

use crate::pose::{AlignedJoint, AlignedJoints, ColorSpacePoint, Joint, JointType, TrackingState};
use crate::sensor::CoordinateMapper;

/// 負の深度をクランプする値（メートル）
///
/// 推定関節の Z は負になることがあり、そのまま変換すると (-inf, -inf) になる。
pub const DEPTH_CLAMP: f32 = 0.01;

/// 1人分の関節をカメラ空間からカラー空間へ投影する
pub struct JointProjector<M> {
    mapper: M,
}

impl<M: CoordinateMapper> JointProjector<M> {
    pub fn new(mapper: M) -> Self {
        Self { mapper }
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// 入力の各関節に対して必ず1つの出力を返す。
    ///
    /// 座標が有限でない関節（入力・変換結果とも）はその関節だけ
    /// `NotTracked` として原点に置く。
    pub fn project(&self, joints: &BTreeMap<JointType, Joint>) -> AlignedJoints {
        joints
            .iter()
            .map(|(joint_type, joint)| (*joint_type, self.project_joint(joint)))
            .collect()
    }

    pub fn project_joint(&self, joint: &Joint) -> AlignedJoint {
        if !joint.position.is_finite() {
            return AlignedJoint::new(ColorSpacePoint::default(), TrackingState::NotTracked);
        }

        let mut position = joint.position;
        if position.z < 0.0 {
            position.z = DEPTH_CLAMP;
        }

        let color = self.mapper.map_camera_point_to_color_space(position);
        if !color.is_finite() {
            return AlignedJoint::new(ColorSpacePoint::default(), TrackingState::NotTracked);
        }
        AlignedJoint::new(color, joint.tracking_state)
    }
}
