//! Driver access and context management.
//!
//! This module is responsible for:
//! - the [`GlDevice`] seam every GPU resource talks through
//! - implementing it over `glow` (real driver) and [`MockDevice`] (tests)
//! - creating the window surface and current GL context ([`GlContext`])

mod context;
mod gl;
mod glow_device;
mod init;
mod mock;

pub use context::{GlContext, SurfacePresenter};
pub use gl::{
    BufferTarget, ComponentType, Filter, GlDevice, GpuHandle, IndexFormat, PixelFormat, Topology,
    UniformLocation, UniformValue, Wrap,
};
pub use init::ContextInit;
pub use mock::{DrawRecord, GlCall, MockDevice, ObjectKind};
