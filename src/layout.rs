//! Size/layout oracle
//!
//! Pure functions from viewport size and slice count to wheel geometry and
//! font scale, plus a time-driven debouncer for resize bursts.

use crate::consts::STROKE_MARGIN;
use crate::settings::LayoutConfig;

/// Browser window inner size (CSS px)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Canvas size and wheel radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelGeometry {
    pub width: f64,
    pub height: f64,
    pub radius: f64,
}

impl WheelGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            radius: (width.min(height) - STROKE_MARGIN) / 2.0,
        }
    }

    /// Derive geometry from the viewport width and layout config
    pub fn from_viewport(viewport_width: f64, config: &LayoutConfig) -> Self {
        let clamped = viewport_width.min(config.max_width);
        let width = clamped - config.margin;
        Self::new(width, width + config.vertical_padding)
    }

    /// Zero, negative or non-finite sizes cannot be drawn
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0 && self.radius > 0.0)
            || !self.width.is_finite()
            || !self.height.is_finite()
    }
}

/// Font tier set used for labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// Phones and narrow viewports
    Compact,
    #[default]
    Standard,
}

impl LayoutMode {
    pub fn for_viewport(viewport_width: f64, config: &LayoutConfig) -> Self {
        if viewport_width < config.compact_breakpoint {
            LayoutMode::Compact
        } else {
            LayoutMode::Standard
        }
    }

    /// Label font size (px): more slices, smaller text
    pub fn label_font_size(&self, slice_count: usize) -> f64 {
        match self {
            LayoutMode::Compact => match slice_count {
                0..=3 => 16.0,
                4..=5 => 12.0,
                6..=9 => 10.0,
                _ => 8.0,
            },
            LayoutMode::Standard => match slice_count {
                0..=3 => 18.0,
                4..=7 => 13.0,
                _ => 11.0,
            },
        }
    }
}

/// Container font size (px) used for the wrapper style
pub fn style_font_size(slice_count: usize) -> f64 {
    match slice_count {
        0..=4 => 16.0,
        5..=6 => 12.0,
        _ => 10.0,
    }
}

/// Inline style for the mount container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelStyle {
    pub width: String,
    pub height: String,
    pub font_size: String,
    pub margin: String,
}

impl WheelStyle {
    pub fn new(geometry: &WheelGeometry, slice_count: usize) -> Self {
        Self {
            width: format!("{}px", geometry.width),
            height: format!("{}px", geometry.height),
            font_size: format!("{}px", style_font_size(slice_count)),
            margin: "0 auto".to_string(),
        }
    }

    pub fn to_css(&self) -> String {
        format!(
            "width: {}; height: {}; font-size: {}; margin: {};",
            self.width, self.height, self.font_size, self.margin
        )
    }
}

/// Holds the latest value until no new one has arrived for `settle_ms`
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    settle_ms: f64,
    pending: Option<(T, f64)>,
}

impl<T> Debouncer<T> {
    pub fn new(settle_ms: f64) -> Self {
        Self {
            settle_ms,
            pending: None,
        }
    }

    pub fn set_settle_ms(&mut self, settle_ms: f64) {
        self.settle_ms = settle_ms;
    }

    /// Record a new value at `now_ms`, replacing (and restarting) any pending one
    pub fn push(&mut self, value: T, now_ms: f64) {
        self.pending = Some((value, now_ms));
    }

    /// Take the pending value once it has settled
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        match &self.pending {
            Some((_, at)) if now_ms - at >= self.settle_ms => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
