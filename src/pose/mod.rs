pub mod body;
pub mod joint;

pub use body::{AlignedJoint, AlignedJoints, Body};
pub use joint::{CameraSpacePoint, ColorSpacePoint, Joint, JointType, TrackingState};
