pub mod overlay;
pub mod skeleton;

pub use overlay::{DisplayMapping, OverlayFrame, Segment};
pub use skeleton::{ANCHOR_ARM_PX, SKELETON_CONNECTIONS};
