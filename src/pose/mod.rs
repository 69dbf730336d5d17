pub mod keypoint;
pub mod replay;

pub use keypoint::{Keypoint, KeypointIndex, Landmark, LandmarkFrame};
pub use replay::{RecordedFrame, ReplaySource};
