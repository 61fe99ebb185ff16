//! GPU resource wrappers and the frame pipeline.
//!
//! Every wrapper owns exactly one driver object and is released explicitly with
//! `release(self, gl)` before the context goes away. Dropping an unreleased
//! wrapper logs a leak warning instead of touching a context that may already be
//! gone.
//!
//! Conventions:
//! - resources take the device as `&dyn GlDevice` on every call
//! - `bind_scoped` guards restore the previous binding on drop

mod binding;
mod buffer;
mod frame;
mod projection;
mod shader;
mod texture;
mod vertex_array;

pub use binding::{BufferBinding, TextureBinding, VertexArrayBinding};
pub use buffer::{IndexBuffer, IndexElement, VertexBuffer};
pub use frame::{Draw, FrameRenderer, FrameState, FrameStats, FrameTarget};
pub use projection::OrthoProjection;
pub use shader::ShaderProgram;
pub use texture::{Texture, TextureParams, TexturePixels};
pub use vertex_array::{VertexArray, VertexAttribute};
