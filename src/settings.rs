//! Wheel props and layout configuration
//!
//! Props arrive as JSON from the host page (camelCase, like the component API).

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{WheelError, WheelResult};
use crate::slice::{ImgParams, SliceId, SliceSet};

/// Layout tuning for the size oracle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Configured max wheel width (px)
    pub max_width: f64,
    /// Subtracted from the clamped viewport width
    pub margin: f64,
    /// Added to the width to get the canvas height (room for the pointer)
    pub vertical_padding: f64,
    /// Resize settle time before recomputing (ms)
    pub settle_ms: f64,
    /// Viewports narrower than this use the compact font tiers
    pub compact_breakpoint: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            margin: MARGIN,
            vertical_padding: VERTICAL_PADDING,
            settle_ms: RESIZE_SETTLE_MS,
            compact_breakpoint: COMPACT_BREAKPOINT,
        }
    }
}

/// Inbound component props
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WheelProps {
    /// Slices to draw
    pub data: SliceSet,
    /// Id of the slice the spin should land on
    pub model_value: SliceId,
    /// Spin duration (ms)
    pub anim_duration: f64,
    /// Back-out easing overshoot
    pub overshoot: f64,
    /// Draw the white disc in the middle
    pub middle_circle: bool,
    /// Optional center image
    pub img_params: Option<ImgParams>,
    /// Label font family
    pub font_family: Option<String>,
    /// Layout tuning (max width etc.)
    pub layout: LayoutConfig,
}

impl Default for WheelProps {
    fn default() -> Self {
        Self {
            data: SliceSet::default(),
            model_value: SliceId(0),
            anim_duration: DEFAULT_ANIM_DURATION_MS,
            overshoot: DEFAULT_OVERSHOOT,
            middle_circle: true,
            img_params: None,
            font_family: None,
            layout: LayoutConfig::default(),
        }
    }
}

impl WheelProps {
    /// Parse props from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Font family with the default applied
    pub fn font_family(&self) -> &str {
        self.font_family.as_deref().unwrap_or(DEFAULT_FONT_FAMILY)
    }

    /// Center image, if one with a non-empty source was given
    pub fn center_image(&self) -> Option<&ImgParams> {
        self.img_params.as_ref().filter(|img| !img.src.is_empty())
    }

    /// Sanity-check numeric props
    pub fn check(&self) -> WheelResult<()> {
        if !(self.layout.max_width > 0.0) {
            return Err(WheelError::InvalidGeometry {
                width: self.layout.max_width,
                height: 0.0,
            });
        }
        Ok(())
    }
}
