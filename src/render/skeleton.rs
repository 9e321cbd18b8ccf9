use crate::pose::JointType;

/// 骨格の接続定義 (開始関節, 終了関節)
pub const BONES: [(JointType, JointType); 24] = [
    // 体幹
    (JointType::Head, JointType::Neck),
    (JointType::Neck, JointType::SpineShoulder),
    (JointType::SpineShoulder, JointType::SpineMid),
    (JointType::SpineMid, JointType::SpineBase),
    (JointType::SpineShoulder, JointType::ShoulderRight),
    (JointType::SpineShoulder, JointType::ShoulderLeft),
    (JointType::SpineBase, JointType::HipRight),
    (JointType::SpineBase, JointType::HipLeft),
    // 右腕
    (JointType::ShoulderRight, JointType::ElbowRight),
    (JointType::ElbowRight, JointType::WristRight),
    (JointType::WristRight, JointType::HandRight),
    (JointType::HandRight, JointType::HandTipRight),
    (JointType::WristRight, JointType::ThumbRight),
    // 左腕
    (JointType::ShoulderLeft, JointType::ElbowLeft),
    (JointType::ElbowLeft, JointType::WristLeft),
    (JointType::WristLeft, JointType::HandLeft),
    (JointType::HandLeft, JointType::HandTipLeft),
    (JointType::WristLeft, JointType::ThumbLeft),
    // 右脚
    (JointType::HipRight, JointType::KneeRight),
    (JointType::KneeRight, JointType::AnkleRight),
    (JointType::AnkleRight, JointType::FootRight),
    // 左脚
    (JointType::HipLeft, JointType::KneeLeft),
    (JointType::KneeLeft, JointType::AnkleLeft),
    (JointType::AnkleLeft, JointType::FootLeft),
];

/// 最初にトラッキングされた人物の骨格線の色 (RGB)
pub const PRIMARY_BONE_COLOR: u32 = 0x00FF00; // 緑

/// 2人目以降の骨格線の色 (RGB)
pub const SECONDARY_BONE_COLOR: u32 = 0x4080FF; // 青

/// トラッキング済み関節の色 (RGB)
pub const TRACKED_JOINT_COLOR: u32 = 0xFFFF00; // 黄色

/// 推定関節の色 (RGB)
pub const INFERRED_JOINT_COLOR: u32 = 0xFF0000; // 赤

/// 関節の描画半径（ピクセル, 表示解像度基準）
pub const JOINT_RADIUS: i32 = 3;

pub fn bone_color(is_first: bool) -> u32 {
    if is_first {
        PRIMARY_BONE_COLOR
    } else {
        SECONDARY_BONE_COLOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bones_cover_every_joint() {
        let covered: HashSet<JointType> = BONES.iter().flat_map(|(a, b)| [*a, *b]).collect();
        assert_eq!(covered.len(), JointType::COUNT);
    }

    #[test]
    fn test_bones_form_a_tree() {
        // 25関節・24本の連結グラフ → 重複・自己ループなし
        let unique: HashSet<(JointType, JointType)> = BONES.iter().copied().collect();
        assert_eq!(unique.len(), BONES.len());
        assert!(BONES.iter().all(|(a, b)| a != b));
    }

    #[test]
    fn test_bone_color() {
        assert_eq!(bone_color(true), PRIMARY_BONE_COLOR);
        assert_eq!(bone_color(false), SECONDARY_BONE_COLOR);
    }
}
