//! センサー状態と表示向きから、ステータスアイコンを決める表示状態。
//!
//! UIフレームワークには依存しない。変更は [`DisplayModel::subscribe`] で
//! 登録した購読者へ [`DisplayChange`] として配信される。

use std::sync::{Arc, Mutex, PoisonError};

/// センサーの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SensorStatus {
    /// センサー未接続
    #[default]
    NoSignal = 0,
    /// センサー稼働中、このフレームで人物なし
    Idle = 1,
    /// このフレームで1人以上トラッキング中
    Tracking = 2,
}

/// 画像の表示向き（ユーザー操作で反転）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Normal,
    Flipped,
}

impl Orientation {
    /// Normal=+1, Flipped=-1
    pub fn sign(self) -> i32 {
        match self {
            Self::Normal => 1,
            Self::Flipped => -1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Normal => Self::Flipped,
            Self::Flipped => Self::Normal,
        }
    }

    pub fn is_flipped(self) -> bool {
        self == Self::Flipped
    }
}

/// ステータスアイコン。インデックスは [`display_index`] の値と一致する。
pub const ICON_ASSETS: [&str; 6] = [
    "/Assets/sensor-off.jpg",
    "/Assets/sensor-off-flip.jpg",
    "/Assets/sensor-standby.jpg",
    "/Assets/sensor-standby-flip.jpg",
    "/Assets/sensor-tracking.jpg",
    "/Assets/sensor-tracking-flip.jpg",
];

/// (状態, 向き) → アイコンテーブルのインデックス
pub fn display_index(status: SensorStatus, orientation: Orientation) -> usize {
    use Orientation::*;
    use SensorStatus::*;
    match (status, orientation) {
        (NoSignal, Normal) => 0,
        (NoSignal, Flipped) => 1,
        (Idle, Normal) => 2,
        (Idle, Flipped) => 3,
        (Tracking, Normal) => 4,
        (Tracking, Flipped) => 5,
    }
}

/// 現在の表示状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayState {
    status: SensorStatus,
    orientation: Orientation,
}

impl DisplayState {
    pub fn new(status: SensorStatus, orientation: Orientation) -> Self {
        Self { status, orientation }
    }

    pub fn status(&self) -> SensorStatus {
        self.status
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn display_index(&self) -> usize {
        display_index(self.status, self.orientation)
    }

    pub fn icon_asset(&self) -> &'static str {
        ICON_ASSETS[self.display_index()]
    }

    /// 値が変わった場合のみ true
    pub fn set_status(&mut self, status: SensorStatus) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        true
    }

    /// 値が変わった場合のみ true
    pub fn set_orientation(&mut self, orientation: Orientation) -> bool {
        if self.orientation == orientation {
            return false;
        }
        self.orientation = orientation;
        true
    }
}

/// 購読者へ配信される変更
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayChange {
    Status(SensorStatus),
    Orientation(Orientation),
    /// 表示インデックスとアイコンの再計算結果
    Presentation { index: usize, asset: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&DisplayChange) + Send + Sync>;

struct Subscribers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Subscriber)>,
}

/// 表示状態の唯一の書き込み口。
///
/// フレーム処理とセンサー接続コールバックの両方から書き込まれるため、
/// 状態は Mutex で保護する。書き込みは `publish` ロックで直列化し、
/// 状態の確定から購読者への配信までを1単位とする。複数スレッドから
/// 書き込んでも、購読者が最後に受け取る `Presentation` は現在の状態と一致する。
///
/// 購読者の中からモデルを読むことはできるが、書き込むとデッドロックする。
pub struct DisplayModel {
    state: Mutex<DisplayState>,
    publish: Mutex<()>,
    subscribers: Mutex<Subscribers>,
}

impl DisplayModel {
    pub fn new(initial: DisplayState) -> Self {
        Self {
            state: Mutex::new(initial),
            publish: Mutex::new(()),
            subscribers: Mutex::new(Subscribers {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }

    /// 起動時の状態（NoSignal, 指定の向き）で共有用に作成
    pub fn shared(orientation: Orientation) -> Arc<Self> {
        Arc::new(Self::new(DisplayState::new(SensorStatus::NoSignal, orientation)))
    }

    pub fn snapshot(&self) -> DisplayState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> SensorStatus {
        self.snapshot().status()
    }

    pub fn orientation(&self) -> Orientation {
        self.snapshot().orientation()
    }

    pub fn display_index(&self) -> usize {
        self.snapshot().display_index()
    }

    pub fn set_status(&self, status: SensorStatus) -> bool {
        let _publish = self.publish.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.set_status(status).then(|| *state)
        };
        match changed {
            Some(state) => {
                self.publish(DisplayChange::Status(status), state);
                true
            }
            None => false,
        }
    }

    pub fn set_orientation(&self, orientation: Orientation) -> bool {
        let _publish = self.publish.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.set_orientation(orientation).then(|| *state)
        };
        match changed {
            Some(state) => {
                self.publish(DisplayChange::Orientation(orientation), state);
                true
            }
            None => false,
        }
    }

    /// 向きを反転し、反転後の向きを返す
    pub fn toggle_orientation(&self) -> Orientation {
        let _publish = self.publish.lock().unwrap_or_else(PoisonError::into_inner);
        let state = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let next = state.orientation().toggled();
            state.set_orientation(next);
            *state
        };
        self.publish(DisplayChange::Orientation(state.orientation()), state);
        state.orientation()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DisplayChange) + Send + Sync + 'static,
    {
        let mut subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(subs.next_id);
        subs.next_id += 1;
        subs.entries.push((id, Arc::new(callback)));
        id
    }

    /// 登録済みなら解除して true
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = subs.entries.len();
        subs.entries.retain(|(entry_id, _)| *entry_id != id);
        subs.entries.len() != before
    }

    fn publish(&self, change: DisplayChange, state: DisplayState) {
        let presentation = DisplayChange::Presentation {
            index: state.display_index(),
            asset: state.icon_asset(),
        };
        log::debug!(
            "display: status={:?} orientation={:?} icon={}",
            state.status(),
            state.orientation(),
            state.icon_asset()
        );

        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();
        for subscriber in &subscribers {
            subscriber(&change);
            subscriber(&presentation);
        }
    }
}

impl Default for DisplayModel {
    fn default() -> Self {
        Self::new(DisplayState::default())
    }
}
