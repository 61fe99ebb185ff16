//! Scoped binding guards.
//!
//! GL keeps one global binding slot per category. A guard binds an object and, on
//! drop, puts back whatever was bound before it, so helper code never leaks binding
//! state into its caller.

use crate::device::{BufferTarget, GlDevice, GpuHandle};

/// Restores the previous buffer binding of one target on drop.
#[must_use = "the previous binding is restored when the guard is dropped"]
pub struct BufferBinding<'a> {
    gl: &'a dyn GlDevice,
    target: BufferTarget,
    previous: Option<GpuHandle>,
}

impl<'a> BufferBinding<'a> {
    pub(crate) fn new(gl: &'a dyn GlDevice, target: BufferTarget, buffer: GpuHandle) -> Self {
        let previous = gl.bound_buffer(target);
        gl.bind_buffer(target, Some(buffer));
        Self { gl, target, previous }
    }
}

impl Drop for BufferBinding<'_> {
    fn drop(&mut self) {
        self.gl.bind_buffer(self.target, self.previous);
    }
}

/// Restores the previous vertex array binding on drop.
#[must_use = "the previous binding is restored when the guard is dropped"]
pub struct VertexArrayBinding<'a> {
    gl: &'a dyn GlDevice,
    previous: Option<GpuHandle>,
}

impl<'a> VertexArrayBinding<'a> {
    pub(crate) fn new(gl: &'a dyn GlDevice, array: GpuHandle) -> Self {
        let previous = gl.bound_vertex_array();
        gl.bind_vertex_array(Some(array));
        Self { gl, previous }
    }
}

impl Drop for VertexArrayBinding<'_> {
    fn drop(&mut self) {
        self.gl.bind_vertex_array(self.previous);
    }
}

/// Restores the previous 2D texture of the active unit on drop.
///
/// The active unit itself is left alone: the guard binds on whichever unit the
/// caller last selected.
#[must_use = "the previous binding is restored when the guard is dropped"]
pub struct TextureBinding<'a> {
    gl: &'a dyn GlDevice,
    previous: Option<GpuHandle>,
}

impl<'a> TextureBinding<'a> {
    pub(crate) fn new(gl: &'a dyn GlDevice, texture: GpuHandle) -> Self {
        let previous = gl.bound_texture();
        gl.bind_texture(Some(texture));
        Self { gl, previous }
    }
}

impl Drop for TextureBinding<'_> {
    fn drop(&mut self) {
        self.gl.bind_texture(self.previous);
    }
}
