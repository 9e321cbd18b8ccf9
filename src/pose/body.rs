use std::collections::BTreeMap;

use super::joint::{CameraSpacePoint, ColorSpacePoint, Joint, JointType, TrackingState};

/// 1フレーム分の人物データ。フレームをまたいで保持しない。
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// SDK が割り当てる ID（フレーム間で同一性は保証されない）
    pub tracking_id: u64,
    pub is_tracked: bool,
    pub joints: BTreeMap<JointType, Joint>,
}

impl Body {
    pub fn new(tracking_id: u64, is_tracked: bool) -> Self {
        Self {
            tracking_id,
            is_tracked,
            joints: BTreeMap::new(),
        }
    }

    /// 未トラッキングのスロット
    pub fn untracked() -> Self {
        Self::new(0, false)
    }

    pub fn with_joint(mut self, joint_type: JointType, position: CameraSpacePoint, state: TrackingState) -> Self {
        self.set_joint(joint_type, position, state);
        self
    }

    pub fn set_joint(&mut self, joint_type: JointType, position: CameraSpacePoint, state: TrackingState) {
        self.joints.insert(joint_type, Joint::new(joint_type, position, state));
    }

    pub fn joint(&self, joint_type: JointType) -> Option<&Joint> {
        self.joints.get(&joint_type)
    }
}

/// カラー空間へ投影済みの関節
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AlignedJoint {
    pub position: ColorSpacePoint,
    pub tracking_state: TrackingState,
}

impl AlignedJoint {
    pub fn new(position: ColorSpacePoint, tracking_state: TrackingState) -> Self {
        Self {
            position,
            tracking_state,
        }
    }

    pub fn is_drawable(&self) -> bool {
        self.tracking_state != TrackingState::NotTracked
    }
}

/// 関節 → カラー空間座標。毎フレーム作り直す。
pub type AlignedJoints = BTreeMap<JointType, AlignedJoint>;
