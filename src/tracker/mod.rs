pub mod dispatch;
pub mod projector;
pub mod sync;

pub use dispatch::TrackingDispatcher;
pub use projector::{JointProjector, DEPTH_CLAMP};
pub use sync::{FrameHandler, TickOutcome, TickStats};
