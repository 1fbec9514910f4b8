//! Fortune Wheel - an SVG prize wheel with a deterministic spin
//!
//! Core modules:
//! - `layout`: Viewport to wheel geometry, font scale, resize debouncing
//! - `scene`: SVG scene graph and the wheel builder
//! - `spin`: Landing computation, easing and the frame-driven spin engine
//! - `wheel`: Host component wiring layout, builder and engine together
//! - `platform`: Browser mount (wasm only)

pub mod error;
pub mod layout;
pub mod platform;
pub mod scene;
pub mod settings;
pub mod slice;
pub mod spin;
pub mod wheel;

pub use error::{WheelError, WheelResult};
pub use layout::{LayoutMode, Viewport, WheelGeometry, WheelStyle};
pub use settings::{LayoutConfig, WheelProps};
pub use slice::{ImgParams, Slice, SliceId, SliceSet};
pub use wheel::{FortuneWheel, FrameOutput};

use glam::DVec2;

/// Wheel configuration constants
pub mod consts {
    /// Degrees in a full turn
    pub const FULL_CIRCLE: f64 = 360.0;
    /// Minimum full turns per spin
    pub const ROTATIONS: f64 = 5.0;
    /// Default back-out overshoot
    pub const DEFAULT_OVERSHOOT: f64 = 0.3;
    /// Default spin duration (ms)
    pub const DEFAULT_ANIM_DURATION_MS: f64 = 5000.0;

    /// Outline width used for wedges, arrow and middle circle
    pub const STROKE_WIDTH: f64 = 8.0;
    /// Subtracted from the smaller dimension before halving into a radius
    pub const STROKE_MARGIN: f64 = 8.0;
    /// Horizontal room left around the wheel inside the viewBox
    pub const CANVAS_GUTTER: f64 = 40.0;
    /// Distance of the pointer tip below the top of the canvas
    pub const ARROW_TOP_OFFSET: f64 = 20.0;

    /// Consecutive failed renders before the builder gives up
    pub const MAX_RENDER_ATTEMPTS: u32 = 3;

    /// Layout defaults
    pub const DEFAULT_MAX_WIDTH: f64 = 600.0;
    pub const MARGIN: f64 = 20.0;
    pub const VERTICAL_PADDING: f64 = 140.0;
    pub const RESIZE_SETTLE_MS: f64 = 150.0;
    pub const COMPACT_BREAKPOINT: f64 = 768.0;

    pub const DEFAULT_FONT_FAMILY: &str = "Arial, sans-serif";
    pub const MOUNT_SELECTOR: &str = "#wheel";
}

/// Normalize an angle in degrees to [0, 360)
#[inline]
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(consts::FULL_CIRCLE);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= consts::FULL_CIRCLE { 0.0 } else { a }
}

/// Convert polar (r, theta) to SVG coordinates.
///
/// Theta is in radians, 0 at twelve o'clock, growing clockwise (SVG y points down).
#[inline]
pub fn polar_to_svg(r: f64, theta: f64) -> DVec2 {
    DVec2::new(r * theta.sin(), -r * theta.cos())
}

/// Format a coordinate for SVG output: at most 3 decimals, no trailing zeros, no `-0`.
pub fn fmt_num(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let s = format!("{:.3}", rounded);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}
