//! Framebuffer geometry and colors.
//!
//! Pixel space follows GL conventions:
//! - origin bottom-left
//! - +X right, +Y up
//!
//! [`OrthoProjection`](crate::render::OrthoProjection) maps it to NDC.

mod color;
mod viewport;

pub use color::ColorRgba;
pub use viewport::Viewport;
