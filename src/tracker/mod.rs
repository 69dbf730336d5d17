pub mod adjust;
pub mod anchor;
pub mod engine;
pub mod fit;
pub mod smooth;

pub use adjust::{apply_override, AdjustedTarget, ManualAdjustment, PlacementTarget};
pub use anchor::{Anchor, AnchorResult, AnchorSelector, AnchorStrategy};
pub use engine::{AnchorEngine, HoldReason, TickOutcome};
pub use fit::{fit_scale, ObjectBounds, ScaleLimits};
pub use smooth::{smooth, SmoothingAlphas, TransformSmoother};
