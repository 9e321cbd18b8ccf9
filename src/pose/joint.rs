/// 深度センサーの 25 関節インデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum JointType {
    SpineBase = 0,
    SpineMid = 1,
    Neck = 2,
    Head = 3,
    ShoulderLeft = 4,
    ElbowLeft = 5,
    WristLeft = 6,
    HandLeft = 7,
    ShoulderRight = 8,
    ElbowRight = 9,
    WristRight = 10,
    HandRight = 11,
    HipLeft = 12,
    KneeLeft = 13,
    AnkleLeft = 14,
    FootLeft = 15,
    HipRight = 16,
    KneeRight = 17,
    AnkleRight = 18,
    FootRight = 19,
    SpineShoulder = 20,
    HandTipLeft = 21,
    ThumbLeft = 22,
    HandTipRight = 23,
    ThumbRight = 24,
}

impl JointType {
    pub const COUNT: usize = 25;

    /// インデックス順の全関節
    pub const ALL: [JointType; JointType::COUNT] = [
        Self::SpineBase,
        Self::SpineMid,
        Self::Neck,
        Self::Head,
        Self::ShoulderLeft,
        Self::ElbowLeft,
        Self::WristLeft,
        Self::HandLeft,
        Self::ShoulderRight,
        Self::ElbowRight,
        Self::WristRight,
        Self::HandRight,
        Self::HipLeft,
        Self::KneeLeft,
        Self::AnkleLeft,
        Self::FootLeft,
        Self::HipRight,
        Self::KneeRight,
        Self::AnkleRight,
        Self::FootRight,
        Self::SpineShoulder,
        Self::HandTipLeft,
        Self::ThumbLeft,
        Self::HandTipRight,
        Self::ThumbRight,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 設定ファイルや OSC アドレスで使う名前
    pub fn name(self) -> &'static str {
        match self {
            Self::SpineBase => "SpineBase",
            Self::SpineMid => "SpineMid",
            Self::Neck => "Neck",
            Self::Head => "Head",
            Self::ShoulderLeft => "ShoulderLeft",
            Self::ElbowLeft => "ElbowLeft",
            Self::WristLeft => "WristLeft",
            Self::HandLeft => "HandLeft",
            Self::ShoulderRight => "ShoulderRight",
            Self::ElbowRight => "ElbowRight",
            Self::WristRight => "WristRight",
            Self::HandRight => "HandRight",
            Self::HipLeft => "HipLeft",
            Self::KneeLeft => "KneeLeft",
            Self::AnkleLeft => "AnkleLeft",
            Self::FootLeft => "FootLeft",
            Self::HipRight => "HipRight",
            Self::KneeRight => "KneeRight",
            Self::AnkleRight => "AnkleRight",
            Self::FootRight => "FootRight",
            Self::SpineShoulder => "SpineShoulder",
            Self::HandTipLeft => "HandTipLeft",
            Self::ThumbLeft => "ThumbLeft",
            Self::HandTipRight => "HandTipRight",
            Self::ThumbRight => "ThumbRight",
        }
    }

    /// 名前から関節を引く（大文字小文字は区別しない）
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|j| j.name().eq_ignore_ascii_case(name))
    }
}

/// 関節ごとのトラッキング状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingState {
    #[default]
    NotTracked,
    /// 推定値（信頼度が低く、深度が負になることがある）
    Inferred,
    Tracked,
}

/// カメラ空間の3D座標（メートル、センサー原点）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraSpacePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CameraSpacePoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// カラー画像のピクセル座標
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorSpacePoint {
    pub x: f32,
    pub y: f32,
}

impl ColorSpacePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// 整数ピクセルに丸める
    pub fn to_pixel(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// 単一関節
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub joint_type: JointType,
    pub position: CameraSpacePoint,
    pub tracking_state: TrackingState,
}

impl Joint {
    pub fn new(joint_type: JointType, position: CameraSpacePoint, tracking_state: TrackingState) -> Self {
        Self {
            joint_type,
            position,
            tracking_state,
        }
    }
}
