//! Two sequential model calls: an initial assessment, then one follow-up
//! chosen from the initial response and the patient context.

pub mod complexity;
pub mod controller;
pub mod routing;
pub mod steps;

pub use complexity::{ComplexityScore, classify_complexity, score_complexity};
pub use controller::{AdaptiveController, build_pipeline};
pub use routing::select_follow_up;
