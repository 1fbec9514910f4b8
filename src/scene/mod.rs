//! SVG scene module
//!
//! The builder is the only writer of the scene. Other components get node ids
//! or a `Weak` to the rotation group, never the scene itself.

pub mod arc;
pub mod builder;
pub mod node;

pub use arc::{LabelArc, SliceArc, pie};
pub use builder::{
    BuildRequest, ImageRequest, RenderKind, RenderState, RotationGroup, SceneHandle, VIS_ID,
    WheelBuilder,
};
pub use node::{Node, NodeId, Scene};
