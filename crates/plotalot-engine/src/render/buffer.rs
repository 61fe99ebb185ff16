use bytemuck::Pod;

use crate::device::{BufferTarget, GlDevice, GpuHandle, IndexFormat};
use crate::error::{RenderError, Result};

use super::binding::BufferBinding;

/// Buffer storage shared by vertex and index buffers.
///
/// Content is written once at creation (static usage); there is no resize or
/// partial update.
struct RawBuffer {
    handle: GpuHandle,
    target: BufferTarget,
    byte_len: usize,
    released: bool,
}

impl RawBuffer {
    fn new(gl: &dyn GlDevice, target: BufferTarget, bytes: &[u8]) -> Result<Self> {
        let handle = gl.create_buffer().map_err(RenderError::Driver)?;
        {
            let _bound = BufferBinding::new(gl, target, handle);
            gl.buffer_data(target, bytes);
        }
        Ok(Self {
            handle,
            target,
            byte_len: bytes.len(),
            released: false,
        })
    }

    fn release(&mut self, gl: &dyn GlDevice) {
        gl.delete_buffer(self.handle);
        self.released = true;
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        if !self.released {
            log::warn!(
                "{:?} buffer {} dropped without release; its GPU memory is leaked",
                self.target,
                self.handle.get()
            );
        }
    }
}

// ── vertex buffer ─────────────────────────────────────────────────────────

/// GPU block of vertex attribute data (`GL_ARRAY_BUFFER`).
pub struct VertexBuffer {
    raw: RawBuffer,
}

impl VertexBuffer {
    /// Uploads `data` into a new static buffer.
    ///
    /// The array-buffer binding that was current before the call is restored.
    pub fn new<T: Pod>(gl: &dyn GlDevice, data: &[T]) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let raw = RawBuffer::new(gl, BufferTarget::Array, bytes)?;
        log::debug!("vertex buffer {} created ({} bytes)", raw.handle.get(), raw.byte_len);
        Ok(Self { raw })
    }

    #[inline]
    pub fn handle(&self) -> GpuHandle {
        self.raw.handle
    }

    /// Size of the uploaded data in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.raw.byte_len
    }

    pub fn bind(&self, gl: &dyn GlDevice) {
        gl.bind_buffer(BufferTarget::Array, Some(self.raw.handle));
    }

    /// Clears the array-buffer binding slot, whichever buffer holds it.
    pub fn unbind(gl: &dyn GlDevice) {
        gl.bind_buffer(BufferTarget::Array, None);
    }

    /// Binds this buffer until the guard is dropped.
    pub fn bind_scoped<'a>(&self, gl: &'a dyn GlDevice) -> BufferBinding<'a> {
        BufferBinding::new(gl, BufferTarget::Array, self.raw.handle)
    }

    /// Deletes the GPU buffer.
    pub fn release(mut self, gl: &dyn GlDevice) {
        log::debug!("vertex buffer {} released", self.raw.handle.get());
        self.raw.release(gl);
    }
}

// ── index buffer ──────────────────────────────────────────────────────────

/// Integer types an index buffer can hold.
pub trait IndexElement: Pod {
    const FORMAT: IndexFormat;

    fn as_u32(self) -> u32;
}

impl IndexElement for u16 {
    const FORMAT: IndexFormat = IndexFormat::U16;

    #[inline]
    fn as_u32(self) -> u32 {
        u32::from(self)
    }
}

impl IndexElement for u32 {
    const FORMAT: IndexFormat = IndexFormat::U32;

    #[inline]
    fn as_u32(self) -> u32 {
        self
    }
}

/// GPU block of vertex indices (`GL_ELEMENT_ARRAY_BUFFER`).
pub struct IndexBuffer {
    raw: RawBuffer,
    format: IndexFormat,
    max_index: Option<u32>,
}

impl IndexBuffer {
    /// Uploads `indices` into a new static buffer.
    ///
    /// Creation does not disturb the element binding of a vertex array that happens
    /// to be bound; attach the buffer with
    /// [`VertexArray::set_index_buffer`](super::VertexArray::set_index_buffer).
    pub fn new<I: IndexElement>(gl: &dyn GlDevice, indices: &[I]) -> Result<Self> {
        let max_index = indices.iter().map(|i| i.as_u32()).max();
        let raw = RawBuffer::new(gl, BufferTarget::Element, bytemuck::cast_slice(indices))?;
        log::debug!(
            "index buffer {} created ({} x {:?})",
            raw.handle.get(),
            indices.len(),
            I::FORMAT
        );
        Ok(Self {
            raw,
            format: I::FORMAT,
            max_index,
        })
    }

    #[inline]
    pub fn handle(&self) -> GpuHandle {
        self.raw.handle
    }

    #[inline]
    pub fn format(&self) -> IndexFormat {
        self.format
    }

    /// Number of indices, implied by byte length and index width.
    #[inline]
    pub fn count(&self) -> u32 {
        (self.raw.byte_len / self.format.size_bytes() as usize) as u32
    }

    /// Largest index value, `None` for an empty buffer.
    #[inline]
    pub fn max_index(&self) -> Option<u32> {
        self.max_index
    }

    /// Binds to the element slot of the currently bound vertex array.
    pub fn bind(&self, gl: &dyn GlDevice) {
        gl.bind_buffer(BufferTarget::Element, Some(self.raw.handle));
    }

    pub fn unbind(gl: &dyn GlDevice) {
        gl.bind_buffer(BufferTarget::Element, None);
    }

    pub fn bind_scoped<'a>(&self, gl: &'a dyn GlDevice) -> BufferBinding<'a> {
        BufferBinding::new(gl, BufferTarget::Element, self.raw.handle)
    }

    /// Deletes the GPU buffer.
    pub fn release(mut self, gl: &dyn GlDevice) {
        log::debug!("index buffer {} released", self.raw.handle.get());
        self.raw.release(gl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{GlCall, MockDevice, ObjectKind};

    #[test]
    fn vertex_upload_is_byte_exact() {
        let gl = MockDevice::new();
        let data = [1.0f32, 2.0, 3.0];
        let vbo = VertexBuffer::new(&gl, &data).unwrap();

        assert_eq!(vbo.byte_len(), 12);
        let stored = gl.buffer_contents(vbo.handle()).unwrap();
        assert_eq!(stored, bytemuck::cast_slice::<f32, u8>(&data));

        vbo.release(&gl);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn creation_restores_previous_binding() {
        let gl = MockDevice::new();
        let first = VertexBuffer::new(&gl, &[0.0f32; 3]).unwrap();
        first.bind(&gl);

        let second = VertexBuffer::new(&gl, &[0.0f32; 6]).unwrap();
        assert_eq!(gl.bound_buffer(BufferTarget::Array), Some(first.handle()));

        VertexBuffer::unbind(&gl);
        assert_eq!(gl.bound_buffer(BufferTarget::Array), None);

        first.release(&gl);
        second.release(&gl);
    }

    #[test]
    fn index_count_follows_width() {
        let gl = MockDevice::new();
        let wide = IndexBuffer::new(&gl, &[0u32, 1, 2, 2, 3, 0]).unwrap();
        let narrow = IndexBuffer::new(&gl, &[0u16, 1, 2]).unwrap();

        assert_eq!(wide.count(), 6);
        assert_eq!(wide.format(), IndexFormat::U32);
        assert_eq!(wide.max_index(), Some(3));
        assert_eq!(narrow.count(), 3);
        assert_eq!(narrow.format(), IndexFormat::U16);
        assert_eq!(gl.buffer_contents(narrow.handle()).unwrap().len(), 6);

        wide.release(&gl);
        narrow.release(&gl);
        assert_eq!(gl.live_of(ObjectKind::Buffer), 0);
    }

    #[test]
    fn empty_index_buffer_has_no_max() {
        let gl = MockDevice::new();
        let ibo = IndexBuffer::new::<u32>(&gl, &[]).unwrap();
        assert_eq!(ibo.count(), 0);
        assert_eq!(ibo.max_index(), None);
        ibo.release(&gl);
    }

    #[test]
    fn scoped_binding_restores_on_drop() {
        let gl = MockDevice::new();
        let a = VertexBuffer::new(&gl, &[0.0f32]).unwrap();
        let b = VertexBuffer::new(&gl, &[0.0f32]).unwrap();
        a.bind(&gl);
        {
            let _guard = b.bind_scoped(&gl);
            assert_eq!(gl.bound_buffer(BufferTarget::Array), Some(b.handle()));
        }
        assert_eq!(gl.bound_buffer(BufferTarget::Array), Some(a.handle()));
        a.release(&gl);
        b.release(&gl);
    }

    #[test]
    fn release_issues_exactly_one_delete() {
        let gl = MockDevice::new();
        let vbo = VertexBuffer::new(&gl, &[0.5f32; 9]).unwrap();
        let handle = vbo.handle();
        gl.clear_calls();

        vbo.release(&gl);
        assert_eq!(gl.calls(), vec![GlCall::DeleteObject(ObjectKind::Buffer, handle)]);
    }

    #[test]
    fn driver_refusal_surfaces_as_error() {
        let gl = MockDevice::new();
        gl.refuse_allocation(true);
        let err = VertexBuffer::new(&gl, &[0.0f32]).err().unwrap();
        assert!(matches!(err, RenderError::Driver(_)));
    }
}
