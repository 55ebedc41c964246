pub mod decision;
pub mod direction;
pub mod offset;
pub mod service;

pub use decision::{decide, ToggleOutcome};
pub use direction::infer_direction;
pub use offset::{resolve, TimeSpec};
pub use service::{ToggleResult, TrackingService, DEFAULT_OFFSET_BOUND};
