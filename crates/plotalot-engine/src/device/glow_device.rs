//! `GlDevice` over the `glow` driver binding.
//!
//! Every call here is a thin `unsafe` forward: `glow` requires a current context,
//! which `GlContext` guarantees for the lifetime of the `glow::Context` it owns.

use std::num::NonZeroU32;

use glow::HasContext;

use super::gl::{
    BufferTarget, ComponentType, Filter, GlDevice, GpuHandle, IndexFormat, PixelFormat, Topology,
    UniformLocation, UniformValue, Wrap,
};
use crate::error::ShaderStage;

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::Element => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn buffer_binding_query(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER_BINDING,
        BufferTarget::Element => glow::ELEMENT_ARRAY_BUFFER_BINDING,
    }
}

fn component_type(ty: ComponentType) -> u32 {
    match ty {
        ComponentType::F32 => glow::FLOAT,
        ComponentType::I8 => glow::BYTE,
        ComponentType::U8 => glow::UNSIGNED_BYTE,
        ComponentType::I16 => glow::SHORT,
        ComponentType::U16 => glow::UNSIGNED_SHORT,
        ComponentType::I32 => glow::INT,
        ComponentType::U32 => glow::UNSIGNED_INT,
    }
}

fn index_type(format: IndexFormat) -> u32 {
    match format {
        IndexFormat::U16 => glow::UNSIGNED_SHORT,
        IndexFormat::U32 => glow::UNSIGNED_INT,
    }
}

fn topology(t: Topology) -> u32 {
    match t {
        Topology::Points => glow::POINTS,
        Topology::Lines => glow::LINES,
        Topology::LineStrip => glow::LINE_STRIP,
        Topology::Triangles => glow::TRIANGLES,
        Topology::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

fn pixel_format(format: PixelFormat) -> (i32, u32) {
    match format {
        PixelFormat::R8 => (glow::R8 as i32, glow::RED),
        PixelFormat::Rg8 => (glow::RG8 as i32, glow::RG),
        PixelFormat::Rgb8 => (glow::RGB8 as i32, glow::RGB),
        PixelFormat::Rgba8 => (glow::RGBA8 as i32, glow::RGBA),
    }
}

fn filter(f: Filter, mipmaps: bool) -> i32 {
    let v = match (f, mipmaps) {
        (Filter::Nearest, false) => glow::NEAREST,
        (Filter::Linear, false) => glow::LINEAR,
        (Filter::Nearest, true) => glow::NEAREST_MIPMAP_NEAREST,
        (Filter::Linear, true) => glow::LINEAR_MIPMAP_LINEAR,
    };
    v as i32
}

fn wrap(w: Wrap) -> i32 {
    let v = match w {
        Wrap::Repeat => glow::REPEAT,
        Wrap::MirroredRepeat => glow::MIRRORED_REPEAT,
        Wrap::ClampToEdge => glow::CLAMP_TO_EDGE,
    };
    v as i32
}

fn shader_type(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

/// Binding queries return the object name as a signed integer; 0 means "none".
fn handle_from_binding(value: i32) -> Option<GpuHandle> {
    NonZeroU32::new(value as u32).map(GpuHandle)
}

impl GlDevice for glow::Context {
    fn create_buffer(&self) -> Result<GpuHandle, String> {
        unsafe { HasContext::create_buffer(self).map(|b| GpuHandle(b.0)) }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<GpuHandle>) {
        unsafe {
            HasContext::bind_buffer(self, buffer_target(target), buffer.map(|h| glow::NativeBuffer(h.0)))
        }
    }

    fn bound_buffer(&self, target: BufferTarget) -> Option<GpuHandle> {
        handle_from_binding(unsafe { self.get_parameter_i32(buffer_binding_query(target)) })
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) {
        unsafe { self.buffer_data_u8_slice(buffer_target(target), data, glow::STATIC_DRAW) }
    }

    fn delete_buffer(&self, buffer: GpuHandle) {
        unsafe { HasContext::delete_buffer(self, glow::NativeBuffer(buffer.0)) }
    }

    fn create_vertex_array(&self) -> Result<GpuHandle, String> {
        unsafe { HasContext::create_vertex_array(self).map(|a| GpuHandle(a.0)) }
    }

    fn bind_vertex_array(&self, array: Option<GpuHandle>) {
        unsafe { HasContext::bind_vertex_array(self, array.map(|h| glow::NativeVertexArray(h.0))) }
    }

    fn bound_vertex_array(&self) -> Option<GpuHandle> {
        handle_from_binding(unsafe { self.get_parameter_i32(glow::VERTEX_ARRAY_BINDING) })
    }

    fn vertex_attrib_pointer(
        &self,
        slot: u32,
        components: u8,
        ty: ComponentType,
        normalized: bool,
        stride: u32,
        offset: u32,
    ) {
        unsafe {
            self.vertex_attrib_pointer_f32(
                slot,
                i32::from(components),
                component_type(ty),
                normalized,
                stride as i32,
                offset as i32,
            )
        }
    }

    fn enable_vertex_attrib_array(&self, slot: u32) {
        unsafe { HasContext::enable_vertex_attrib_array(self, slot) }
    }

    fn delete_vertex_array(&self, array: GpuHandle) {
        unsafe { HasContext::delete_vertex_array(self, glow::NativeVertexArray(array.0)) }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<GpuHandle, String> {
        unsafe { HasContext::create_shader(self, shader_type(stage)).map(|s| GpuHandle(s.0)) }
    }

    fn shader_source(&self, shader: GpuHandle, source: &str) {
        unsafe { HasContext::shader_source(self, glow::NativeShader(shader.0), source) }
    }

    fn compile_shader(&self, shader: GpuHandle) {
        unsafe { HasContext::compile_shader(self, glow::NativeShader(shader.0)) }
    }

    fn shader_compile_status(&self, shader: GpuHandle) -> bool {
        unsafe { self.get_shader_compile_status(glow::NativeShader(shader.0)) }
    }

    fn shader_info_log(&self, shader: GpuHandle) -> String {
        unsafe { self.get_shader_info_log(glow::NativeShader(shader.0)) }
    }

    fn delete_shader(&self, shader: GpuHandle) {
        unsafe { HasContext::delete_shader(self, glow::NativeShader(shader.0)) }
    }

    fn create_program(&self) -> Result<GpuHandle, String> {
        unsafe { HasContext::create_program(self).map(|p| GpuHandle(p.0)) }
    }

    fn attach_shader(&self, program: GpuHandle, shader: GpuHandle) {
        unsafe {
            HasContext::attach_shader(self, glow::NativeProgram(program.0), glow::NativeShader(shader.0))
        }
    }

    fn detach_shader(&self, program: GpuHandle, shader: GpuHandle) {
        unsafe {
            HasContext::detach_shader(self, glow::NativeProgram(program.0), glow::NativeShader(shader.0))
        }
    }

    fn link_program(&self, program: GpuHandle) {
        unsafe { HasContext::link_program(self, glow::NativeProgram(program.0)) }
    }

    fn program_link_status(&self, program: GpuHandle) -> bool {
        unsafe { self.get_program_link_status(glow::NativeProgram(program.0)) }
    }

    fn program_info_log(&self, program: GpuHandle) -> String {
        unsafe { self.get_program_info_log(glow::NativeProgram(program.0)) }
    }

    fn use_program(&self, program: Option<GpuHandle>) {
        unsafe { HasContext::use_program(self, program.map(|h| glow::NativeProgram(h.0))) }
    }

    fn delete_program(&self, program: GpuHandle) {
        unsafe { HasContext::delete_program(self, glow::NativeProgram(program.0)) }
    }

    fn uniform_location(&self, program: GpuHandle, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.get_uniform_location(glow::NativeProgram(program.0), name)
                .map(|l| UniformLocation(l.0))
        }
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let loc = glow::NativeUniformLocation(location.0);
        let loc = Some(&loc);
        unsafe {
            match *value {
                UniformValue::Int(v) => self.uniform_1_i32(loc, v),
                UniformValue::Float(v) => self.uniform_1_f32(loc, v),
                UniformValue::Vec2([x, y]) => self.uniform_2_f32(loc, x, y),
                UniformValue::Vec4([x, y, z, w]) => self.uniform_4_f32(loc, x, y, z, w),
                UniformValue::Mat4(ref m) => self.uniform_matrix_4_f32_slice(loc, false, m),
            }
        }
    }

    fn create_texture(&self) -> Result<GpuHandle, String> {
        unsafe { HasContext::create_texture(self).map(|t| GpuHandle(t.0)) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { HasContext::active_texture(self, glow::TEXTURE0 + unit) }
    }

    fn active_texture_unit(&self) -> u32 {
        let unit = unsafe { self.get_parameter_i32(glow::ACTIVE_TEXTURE) } as u32;
        unit.saturating_sub(glow::TEXTURE0)
    }

    fn bound_texture(&self) -> Option<GpuHandle> {
        handle_from_binding(unsafe { self.get_parameter_i32(glow::TEXTURE_BINDING_2D) })
    }

    fn bind_texture(&self, texture: Option<GpuHandle>) {
        unsafe {
            HasContext::bind_texture(self, glow::TEXTURE_2D, texture.map(|h| glow::NativeTexture(h.0)))
        }
    }

    fn tex_image_2d(&self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]) {
        let (internal, layout) = pixel_format(format);
        unsafe {
            // Rows of RGB/R8 images are not 4-byte aligned in general.
            self.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            HasContext::tex_image_2d(
                self,
                glow::TEXTURE_2D,
                0,
                internal,
                width as i32,
                height as i32,
                0,
                layout,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            );
        }
    }

    fn tex_parameters(&self, min: Filter, mag: Filter, wrap_mode: Wrap, mipmaps: bool) {
        unsafe {
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter(min, mipmaps));
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter(mag, false));
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap(wrap_mode));
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap(wrap_mode));
        }
    }

    fn generate_mipmap(&self) {
        unsafe { HasContext::generate_mipmap(self, glow::TEXTURE_2D) }
    }

    fn delete_texture(&self, texture: GpuHandle) {
        unsafe { HasContext::delete_texture(self, glow::NativeTexture(texture.0)) }
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { HasContext::viewport(self, x, y, width as i32, height as i32) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { HasContext::clear_color(self, r, g, b, a) }
    }

    fn clear(&self) {
        unsafe { HasContext::clear(self, glow::COLOR_BUFFER_BIT) }
    }

    fn draw_elements(&self, t: Topology, count: u32, format: IndexFormat, byte_offset: u32) {
        unsafe {
            HasContext::draw_elements(self, topology(t), count as i32, index_type(format), byte_offset as i32)
        }
    }
}
