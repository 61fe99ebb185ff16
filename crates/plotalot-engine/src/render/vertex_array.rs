use crate::device::{ComponentType, GlDevice, GpuHandle, IndexFormat, Topology};
use crate::error::{RenderError, Result};

use super::binding::VertexArrayBinding;
use super::buffer::{IndexBuffer, VertexBuffer};

/// One attribute slot declaration.
///
/// `stride` and `offset` are in bytes and must describe the interleaving of the
/// buffer the slot reads from. `slot` must match the `layout(location = N)` the
/// paired shader program declares. Neither is checked against the shader.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub slot: u32,
    pub components: u8,
    pub ty: ComponentType,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

impl VertexAttribute {
    /// `components` floats read from `offset` bytes into each `stride`-byte vertex.
    pub const fn floats(slot: u32, components: u8, stride: u32, offset: u32) -> Self {
        Self {
            slot,
            components,
            ty: ComponentType::F32,
            normalized: false,
            stride,
            offset,
        }
    }

    /// Size of one attribute value in bytes.
    #[inline]
    pub const fn value_size(&self) -> u32 {
        self.components as u32 * self.ty.size_bytes()
    }

    /// Distance between consecutive vertices; a zero stride means tightly packed.
    #[inline]
    pub const fn effective_stride(&self) -> u32 {
        if self.stride == 0 { self.value_size() } else { self.stride }
    }

    /// Number of whole vertices a buffer of `byte_len` bytes supplies to this slot.
    ///
    /// An attribute without components reads nothing and supplies no vertices.
    pub fn vertex_count(&self, byte_len: usize) -> u32 {
        let stride = self.effective_stride() as usize;
        let needed = self.offset as usize + self.value_size() as usize;
        if stride == 0 || byte_len < needed {
            return 0;
        }
        ((byte_len - needed) / stride + 1) as u32
    }

    fn validate(&self) -> Result<()> {
        if (1..=4).contains(&self.components) {
            Ok(())
        } else {
            Err(RenderError::InvalidAttribute {
                slot: self.slot,
                components: self.components,
            })
        }
    }
}

/// A linked slot and the vertices its buffer supplies.
#[derive(Debug, Copy, Clone)]
struct LinkedAttribute {
    attr: VertexAttribute,
    vertices: u32,
}

#[derive(Debug, Copy, Clone)]
struct IndexBinding {
    count: u32,
    format: IndexFormat,
    max_index: Option<u32>,
}

/// Vertex array object: attribute slot → buffer mappings plus one index buffer.
pub struct VertexArray {
    handle: GpuHandle,
    attributes: Vec<LinkedAttribute>,
    index: Option<IndexBinding>,
    released: bool,
}

impl VertexArray {
    pub fn new(gl: &dyn GlDevice) -> Result<Self> {
        let handle = gl.create_vertex_array().map_err(RenderError::Driver)?;
        log::debug!("vertex array {} created", handle.get());
        Ok(Self {
            handle,
            attributes: Vec::new(),
            index: None,
            released: false,
        })
    }

    #[inline]
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Linked slots in link order.
    pub fn attributes(&self) -> impl Iterator<Item = VertexAttribute> + '_ {
        self.attributes.iter().map(|l| l.attr)
    }

    /// Vertices addressable through every linked attribute, `None` before any link.
    pub fn vertex_count(&self) -> Option<u32> {
        self.attributes.iter().map(|l| l.vertices).min()
    }

    /// Indices the draw call will consume (0 without an index buffer).
    pub fn index_count(&self) -> u32 {
        self.index.map_or(0, |i| i.count)
    }

    pub fn bind(&self, gl: &dyn GlDevice) {
        gl.bind_vertex_array(Some(self.handle));
    }

    pub fn unbind(gl: &dyn GlDevice) {
        gl.bind_vertex_array(None);
    }

    pub fn bind_scoped<'a>(&self, gl: &'a dyn GlDevice) -> VertexArrayBinding<'a> {
        VertexArrayBinding::new(gl, self.handle)
    }

    /// Declares `buffer` as the data source of `attr.slot` and enables the slot.
    ///
    /// Both the array and the buffer are bound for the duration of the call and the
    /// previous bindings are restored afterwards. Returns the number of vertices
    /// the buffer supplies to the slot. Relinking a slot replaces its previous
    /// source.
    ///
    /// Fails without touching GL state if `attr` has no components or more than four.
    pub fn link_attribute(
        &mut self,
        gl: &dyn GlDevice,
        buffer: &VertexBuffer,
        attr: VertexAttribute,
    ) -> Result<u32> {
        attr.validate()?;
        {
            let _array = self.bind_scoped(gl);
            let _buffer = buffer.bind_scoped(gl);
            gl.vertex_attrib_pointer(
                attr.slot,
                attr.components,
                attr.ty,
                attr.normalized,
                attr.stride,
                attr.offset,
            );
            gl.enable_vertex_attrib_array(attr.slot);
        }

        let count = attr.vertex_count(buffer.byte_len());
        self.attributes.retain(|l| l.attr.slot != attr.slot);
        self.attributes.push(LinkedAttribute { attr, vertices: count });

        log::debug!(
            "vertex array {}: slot {} <- buffer {} ({} x {:?}, stride {}, offset {}, {} vertices)",
            self.handle.get(),
            attr.slot,
            buffer.handle().get(),
            attr.components,
            attr.ty,
            attr.stride,
            attr.offset,
            count
        );
        Ok(count)
    }

    /// Associates `indices` with this array.
    ///
    /// Fails if an index would address a vertex past the end of the linked data.
    pub fn set_index_buffer(&mut self, gl: &dyn GlDevice, indices: &IndexBuffer) -> Result<()> {
        let binding = IndexBinding {
            count: indices.count(),
            format: indices.format(),
            max_index: indices.max_index(),
        };
        self.check_indices(binding)?;

        {
            // The element binding is array state: it stays with this array.
            let _array = self.bind_scoped(gl);
            indices.bind(gl);
        }

        self.index = Some(binding);
        log::debug!(
            "vertex array {}: index buffer {} ({} indices)",
            self.handle.get(),
            indices.handle().get(),
            binding.count
        );
        Ok(())
    }

    fn check_indices(&self, binding: IndexBinding) -> Result<()> {
        match (binding.max_index, self.vertex_count()) {
            (Some(max_index), Some(vertex_count)) if max_index >= vertex_count => {
                Err(RenderError::IndexOutOfRange { max_index, vertex_count })
            }
            _ => Ok(()),
        }
    }

    /// Binds this array and issues one indexed draw over its whole index buffer.
    ///
    /// Returns the number of indices drawn; an empty index buffer draws nothing.
    pub fn draw(&self, gl: &dyn GlDevice, topology: Topology) -> Result<u32> {
        let index = self.index.ok_or(RenderError::MissingIndexBuffer)?;
        self.check_indices(index)?;

        self.bind(gl);
        if index.count > 0 {
            gl.draw_elements(topology, index.count, index.format, 0);
        }
        Ok(index.count)
    }

    /// Deletes the vertex array object. Linked buffers are not affected.
    pub fn release(mut self, gl: &dyn GlDevice) {
        gl.delete_vertex_array(self.handle);
        self.released = true;
        log::debug!("vertex array {} released", self.handle.get());
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("vertex array {} dropped without release", self.handle.get());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BufferTarget, GlCall, MockDevice};

    const TRIANGLE: [f32; 9] = [
        -0.5, -0.2887, 0.0, //
        0.5, -0.2887, 0.0, //
        0.0, 0.5774, 0.0,
    ];

    #[test]
    fn vertex_count_respects_stride_and_offset() {
        let pos = VertexAttribute::floats(0, 3, 20, 0);
        let uv = VertexAttribute::floats(1, 2, 20, 12);
        // 4 interleaved vertices of 5 floats.
        assert_eq!(pos.vertex_count(80), 4);
        assert_eq!(uv.vertex_count(80), 4);
        assert_eq!(uv.vertex_count(79), 3);
        assert_eq!(pos.vertex_count(8), 0);
    }

    #[test]
    fn zero_stride_is_tightly_packed() {
        let attr = VertexAttribute::floats(0, 3, 0, 0);
        assert_eq!(attr.effective_stride(), 12);
        assert_eq!(attr.vertex_count(36), 3);
    }

    #[test]
    fn link_declares_and_enables_slot() {
        let gl = MockDevice::new();
        let vbo = VertexBuffer::new(&gl, &TRIANGLE).unwrap();
        let mut vao = VertexArray::new(&gl).unwrap();
        gl.clear_calls();

        let count = vao.link_attribute(&gl, &vbo, VertexAttribute::floats(0, 3, 12, 0)).unwrap();
        assert_eq!(count, 3);

        assert_eq!(
            gl.calls(),
            vec![
                GlCall::BindVertexArray(Some(vao.handle())),
                GlCall::BindBuffer(BufferTarget::Array, Some(vbo.handle())),
                GlCall::VertexAttribPointer {
                    slot: 0,
                    components: 3,
                    ty: ComponentType::F32,
                    normalized: false,
                    stride: 12,
                    offset: 0,
                },
                GlCall::EnableVertexAttribArray(0),
                GlCall::BindBuffer(BufferTarget::Array, None),
                GlCall::BindVertexArray(None),
            ]
        );

        vao.release(&gl);
        vbo.release(&gl);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn relinking_a_slot_replaces_it() {
        let gl = MockDevice::new();
        let vbo = VertexBuffer::new(&gl, &TRIANGLE).unwrap();
        let mut vao = VertexArray::new(&gl).unwrap();
        vao.link_attribute(&gl, &vbo, VertexAttribute::floats(0, 3, 12, 0)).unwrap();
        vao.link_attribute(&gl, &vbo, VertexAttribute::floats(0, 2, 12, 0)).unwrap();
        let linked: Vec<_> = vao.attributes().collect();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].components, 2);
        vao.release(&gl);
        vbo.release(&gl);
    }

    #[test]
    fn relinking_to_a_larger_buffer_widens_the_index_range() {
        let gl = MockDevice::new();
        let small = VertexBuffer::new(&gl, &TRIANGLE).unwrap();
        let large = VertexBuffer::new(&gl, &[0.0f32; 18]).unwrap();
        let ibo = IndexBuffer::new(&gl, &[0u32, 4, 5]).unwrap();
        let mut vao = VertexArray::new(&gl).unwrap();

        vao.link_attribute(&gl, &small, VertexAttribute::floats(0, 3, 12, 0)).unwrap();
        assert_eq!(vao.vertex_count(), Some(3));
        assert_eq!(
            vao.link_attribute(&gl, &large, VertexAttribute::floats(0, 3, 12, 0)).unwrap(),
            6
        );
        assert_eq!(vao.vertex_count(), Some(6));
        assert_eq!(vao.attributes().count(), 1);

        vao.set_index_buffer(&gl, &ibo).unwrap();
        assert_eq!(vao.draw(&gl, Topology::Triangles).unwrap(), 3);

        vao.release(&gl);
        ibo.release(&gl);
        large.release(&gl);
        small.release(&gl);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn attribute_without_components_is_rejected() {
        let gl = MockDevice::new();
        let vbo = VertexBuffer::new(&gl, &TRIANGLE).unwrap();
        let mut vao = VertexArray::new(&gl).unwrap();
        gl.clear_calls();

        for components in [0, 5] {
            let err = vao
                .link_attribute(&gl, &vbo, VertexAttribute::floats(0, components, 0, 0))
                .unwrap_err();
            assert!(matches!(
                err,
                RenderError::InvalidAttribute { slot: 0, components: c } if c == components
            ));
        }
        assert!(gl.calls().is_empty());
        assert_eq!(vao.vertex_count(), None);
        assert_eq!(VertexAttribute::floats(0, 0, 0, 0).vertex_count(36), 0);

        vao.release(&gl);
        vbo.release(&gl);
    }

    #[test]
    fn index_buffer_is_captured_by_the_array() {
        let gl = MockDevice::new();
        let vbo = VertexBuffer::new(&gl, &TRIANGLE).unwrap();
        let ibo = IndexBuffer::new(&gl, &[0u32, 1, 2]).unwrap();
        let mut vao = VertexArray::new(&gl).unwrap();
        vao.link_attribute(&gl, &vbo, VertexAttribute::floats(0, 3, 12, 0)).unwrap();
        vao.set_index_buffer(&gl, &ibo).unwrap();

        assert_eq!(gl.element_buffer_of(vao.handle()), Some(ibo.handle()));
        assert_eq!(gl.bound_vertex_array(), None);
        assert_eq!(vao.index_count(), 3);

        vao.release(&gl);
        ibo.release(&gl);
        vbo.release(&gl);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let gl = MockDevice::new();
        let vbo = VertexBuffer::new(&gl, &TRIANGLE).unwrap();
        let ibo = IndexBuffer::new(&gl, &[0u32, 1, 3]).unwrap();
        let mut vao = VertexArray::new(&gl).unwrap();
        vao.link_attribute(&gl, &vbo, VertexAttribute::floats(0, 3, 12, 0)).unwrap();

        let err = vao.set_index_buffer(&gl, &ibo).unwrap_err();
        assert!(matches!(
            err,
            RenderError::IndexOutOfRange { max_index: 3, vertex_count: 3 }
        ));
        assert_eq!(vao.index_count(), 0);

        vao.release(&gl);
        ibo.release(&gl);
        vbo.release(&gl);
    }

    #[test]
    fn indices_set_before_linking_are_checked_at_draw() {
        let gl = MockDevice::new();
        let vbo = VertexBuffer::new(&gl, &TRIANGLE).unwrap();
        let ibo = IndexBuffer::new(&gl, &[0u32, 1, 5]).unwrap();
        let mut vao = VertexArray::new(&gl).unwrap();
        vao.set_index_buffer(&gl, &ibo).unwrap();
        vao.link_attribute(&gl, &vbo, VertexAttribute::floats(0, 3, 12, 0)).unwrap();

        assert!(vao.draw(&gl, Topology::Triangles).is_err());
        assert!(gl.draws().is_empty());

        vao.release(&gl);
        ibo.release(&gl);
        vbo.release(&gl);
    }

    #[test]
    fn draw_without_indices_fails() {
        let gl = MockDevice::new();
        let vao = VertexArray::new(&gl).unwrap();
        assert!(matches!(
            vao.draw(&gl, Topology::Lines),
            Err(RenderError::MissingIndexBuffer)
        ));
        vao.release(&gl);
    }

    #[test]
    fn single_triangle_is_one_draw_in_winding_order() {
        let gl = MockDevice::new();
        let vbo = VertexBuffer::new(&gl, &TRIANGLE).unwrap();
        let ibo = IndexBuffer::new(&gl, &[0u32, 1, 2]).unwrap();
        let mut vao = VertexArray::new(&gl).unwrap();
        vao.link_attribute(&gl, &vbo, VertexAttribute::floats(0, 3, 12, 0)).unwrap();
        vao.set_index_buffer(&gl, &ibo).unwrap();

        assert_eq!(vao.draw(&gl, Topology::Triangles).unwrap(), 3);

        let draws = gl.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].topology, Topology::Triangles);
        assert_eq!(draws[0].count, 3);
        assert_eq!(draws[0].vertex_array, Some(vao.handle()));
        assert_eq!(draws[0].element_buffer, Some(ibo.handle()));

        let stored = gl.buffer_contents(ibo.handle()).unwrap();
        let order: Vec<u32> = bytemuck::pod_collect_to_vec(&stored);
        assert_eq!(order, [0, 1, 2]);

        vao.release(&gl);
        ibo.release(&gl);
        vbo.release(&gl);
    }
}
