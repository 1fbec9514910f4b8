//! Spin module
//!
//! Landing computation, easing curves, the frame-driven animator and the
//! engine that ties them together.

pub mod animator;
pub mod easing;
pub mod engine;
pub mod plan;

pub use animator::Animator;
pub use easing::{Easing, Tween, interpolate};
pub use engine::{SpinConfig, SpinEngine};
pub use plan::{SpinPlan, picked_index, plan_spin};
