//! Platform layer
//!
//! The browser mount lives here. Native builds have no platform layer; the
//! demo binary drives `FortuneWheel` directly.

#[cfg(target_arch = "wasm32")]
pub mod dom;

#[cfg(target_arch = "wasm32")]
pub use dom::DomMount;
