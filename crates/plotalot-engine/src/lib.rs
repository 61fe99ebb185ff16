//! Plot-a-Lot engine crate.
//!
//! GPU resource lifecycle on top of OpenGL 3.3 core: buffers, vertex arrays,
//! shader programs and textures, the asset resolver that finds their sources,
//! and the per-frame pipeline plus the window runtime that drives it.

pub mod assets;
pub mod core;
pub mod coords;
pub mod device;
pub mod error;
pub mod logging;
pub mod render;
pub mod window;

pub use error::{RenderError, Result, ShaderStage};
