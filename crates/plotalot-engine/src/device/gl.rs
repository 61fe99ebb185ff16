use std::num::NonZeroU32;

use crate::error::ShaderStage;

/// Opaque driver-issued object name.
///
/// Owned by exactly one resource wrapper; meaningless after that wrapper is released.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GpuHandle(pub NonZeroU32);

impl GpuHandle {
    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Resolved uniform slot inside a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation(pub u32);

/// Buffer binding category. Each category has a single global binding slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    /// `GL_ARRAY_BUFFER`
    Array,
    /// `GL_ELEMENT_ARRAY_BUFFER` (captured by the bound vertex array)
    Element,
}

/// Scalar type of one attribute component.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComponentType {
    F32,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
}

impl ComponentType {
    #[inline]
    pub const fn size_bytes(self) -> u32 {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::F32 | ComponentType::I32 | ComponentType::U32 => 4,
        }
    }
}

/// Width of the integers stored in an index buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    #[inline]
    pub const fn size_bytes(self) -> u32 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// Primitive assembly mode for indexed draws.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

/// Pixel layout of texture data, by channel count.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::R8),
            2 => Some(PixelFormat::Rg8),
            3 => Some(PixelFormat::Rgb8),
            4 => Some(PixelFormat::Rgba8),
            _ => None,
        }
    }

    pub const fn channels(self) -> u8 {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rg8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Texture sampling filter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Texture coordinate wrapping.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Wrap {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

/// Value uploaded to a uniform location.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    /// Column-major 4×4 matrix.
    Mat4([f32; 16]),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<glam::Mat4> for UniformValue {
    fn from(m: glam::Mat4) -> Self {
        UniformValue::Mat4(m.to_cols_array())
    }
}

/// Driver binding seam.
///
/// Covers exactly the GL entry points the resource layer issues. Implemented for
/// `glow::Context` and by [`MockDevice`](super::MockDevice).
///
/// All calls must come from the thread that owns the current context.
pub trait GlDevice {
    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&self) -> Result<GpuHandle, String>;
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<GpuHandle>);
    /// Returns the buffer currently bound to `target`.
    fn bound_buffer(&self, target: BufferTarget) -> Option<GpuHandle>;
    /// Static, write-once upload into the buffer bound to `target`.
    fn buffer_data(&self, target: BufferTarget, data: &[u8]);
    fn delete_buffer(&self, buffer: GpuHandle);

    // ── vertex arrays ─────────────────────────────────────────────────────

    fn create_vertex_array(&self) -> Result<GpuHandle, String>;
    fn bind_vertex_array(&self, array: Option<GpuHandle>);
    fn bound_vertex_array(&self) -> Option<GpuHandle>;
    fn vertex_attrib_pointer(
        &self,
        slot: u32,
        components: u8,
        ty: ComponentType,
        normalized: bool,
        stride: u32,
        offset: u32,
    );
    fn enable_vertex_attrib_array(&self, slot: u32);
    fn delete_vertex_array(&self, array: GpuHandle);

    // ── shaders / programs ────────────────────────────────────────────────

    fn create_shader(&self, stage: ShaderStage) -> Result<GpuHandle, String>;
    fn shader_source(&self, shader: GpuHandle, source: &str);
    fn compile_shader(&self, shader: GpuHandle);
    fn shader_compile_status(&self, shader: GpuHandle) -> bool;
    fn shader_info_log(&self, shader: GpuHandle) -> String;
    fn delete_shader(&self, shader: GpuHandle);

    fn create_program(&self) -> Result<GpuHandle, String>;
    fn attach_shader(&self, program: GpuHandle, shader: GpuHandle);
    fn detach_shader(&self, program: GpuHandle, shader: GpuHandle);
    fn link_program(&self, program: GpuHandle);
    fn program_link_status(&self, program: GpuHandle) -> bool;
    fn program_info_log(&self, program: GpuHandle) -> String;
    fn use_program(&self, program: Option<GpuHandle>);
    fn delete_program(&self, program: GpuHandle);

    fn uniform_location(&self, program: GpuHandle, name: &str) -> Option<UniformLocation>;
    /// Uploads into the currently active program.
    fn set_uniform(&self, location: UniformLocation, value: &UniformValue);

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> Result<GpuHandle, String>;
    fn active_texture(&self, unit: u32);
    /// 0-based index of the active texture unit.
    fn active_texture_unit(&self) -> u32;
    fn bind_texture(&self, texture: Option<GpuHandle>);
    /// 2D texture bound to the active unit.
    fn bound_texture(&self) -> Option<GpuHandle>;
    fn tex_image_2d(&self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]);
    fn tex_parameters(&self, min: Filter, mag: Filter, wrap: Wrap, mipmaps: bool);
    fn generate_mipmap(&self);
    fn delete_texture(&self, texture: GpuHandle);

    // ── frame ─────────────────────────────────────────────────────────────

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    /// Clears the color attachment of the current framebuffer.
    fn clear(&self);
    /// Indexed draw from the element buffer captured by the bound vertex array.
    fn draw_elements(&self, topology: Topology, count: u32, format: IndexFormat, byte_offset: u32);
}
