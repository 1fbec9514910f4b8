//! Wheel errors

use thiserror::Error;

/// Everything that can go wrong while building or spinning a wheel
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WheelError {
    #[error("wheel data cannot be empty")]
    EmptyData,
    #[error("invalid data format at index {index}: missing or invalid '{field}' property")]
    InvalidSlice { index: usize, field: &'static str },
    #[error("scene not ready: {0}")]
    SceneNotReady(&'static str),
    #[error("failed to load center image: {src}")]
    ImageLoad { src: String },
    #[error("maximum render attempts ({attempts}) reached, reset the wheel to retry")]
    RenderRetryExhausted { attempts: u32 },
    #[error("invalid wheel size {width}x{height}: width and height must be positive")]
    InvalidGeometry { width: f64, height: f64 },
    #[error("spin animation interrupted: {0}")]
    AnimationInterrupted(&'static str),
}

pub type WheelResult<T> = Result<T, WheelError>;
