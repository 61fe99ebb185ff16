//! Recording `GlDevice` for tests (no GPU required).
//!
//! `MockDevice` hands out object names, tracks which objects are alive and what is
//! bound to every binding slot, and records each call in order so tests can assert
//! on the exact command stream a resource or frame issues.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU32;

use super::gl::{
    BufferTarget, ComponentType, Filter, GlDevice, GpuHandle, IndexFormat, PixelFormat, Topology,
    UniformLocation, UniformValue, Wrap,
};
use crate::error::ShaderStage;

/// Kind of a live driver object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ObjectKind {
    Buffer,
    VertexArray,
    Shader(ShaderStage),
    Program,
    Texture,
}

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateObject(ObjectKind, GpuHandle),
    DeleteObject(ObjectKind, GpuHandle),
    BindBuffer(BufferTarget, Option<GpuHandle>),
    BufferData(BufferTarget, usize),
    BindVertexArray(Option<GpuHandle>),
    VertexAttribPointer {
        slot: u32,
        components: u8,
        ty: ComponentType,
        normalized: bool,
        stride: u32,
        offset: u32,
    },
    EnableVertexAttribArray(u32),
    CompileShader(GpuHandle),
    AttachShader(GpuHandle, GpuHandle),
    DetachShader(GpuHandle, GpuHandle),
    LinkProgram(GpuHandle),
    UseProgram(Option<GpuHandle>),
    SetUniform(UniformLocation, UniformValue),
    ActiveTexture(u32),
    BindTexture(Option<GpuHandle>),
    TexImage2d { width: u32, height: u32, format: PixelFormat, len: usize },
    TexParameters { min: Filter, mag: Filter, wrap: Wrap, mipmaps: bool },
    GenerateMipmap,
    Viewport(i32, i32, u32, u32),
    ClearColor([f32; 4]),
    Clear,
    DrawElements { topology: Topology, count: u32, format: IndexFormat, offset: u32 },
}

/// An indexed draw as the mock observed it, with the state bound at the time.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub topology: Topology,
    pub count: u32,
    pub format: IndexFormat,
    pub offset: u32,
    pub program: Option<GpuHandle>,
    pub vertex_array: Option<GpuHandle>,
    pub element_buffer: Option<GpuHandle>,
}

#[derive(Default)]
struct State {
    live: BTreeMap<GpuHandle, ObjectKind>,
    created: usize,
    deleted: usize,

    array_buffer: Option<GpuHandle>,
    /// Element binding when no vertex array is bound.
    element_buffer: Option<GpuHandle>,
    /// Element binding captured per vertex array.
    vao_elements: HashMap<GpuHandle, Option<GpuHandle>>,
    vertex_array: Option<GpuHandle>,
    program: Option<GpuHandle>,
    active_unit: u32,
    textures: HashMap<u32, Option<GpuHandle>>,

    buffer_contents: HashMap<GpuHandle, Vec<u8>>,
    shader_sources: HashMap<GpuHandle, String>,
    compiled: HashMap<GpuHandle, bool>,
    attached: HashMap<GpuHandle, Vec<GpuHandle>>,
    linked: HashMap<GpuHandle, bool>,
    uniforms: HashMap<GpuHandle, Vec<String>>,

    calls: Vec<GlCall>,
    draws: Vec<DrawRecord>,
}

/// In-memory driver double.
pub struct MockDevice {
    state: RefCell<State>,
    next_name: Cell<u32>,
    compile_failures: RefCell<HashMap<ShaderStage, String>>,
    link_failure: RefCell<Option<String>>,
    refuse_allocation: Cell<bool>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::default()),
            next_name: Cell::new(1),
            compile_failures: RefCell::new(HashMap::new()),
            link_failure: RefCell::new(None),
            refuse_allocation: Cell::new(false),
        }
    }

    // ── failure injection ─────────────────────────────────────────────────

    /// Makes every subsequent compile of `stage` fail with `log`.
    pub fn fail_compile(&self, stage: ShaderStage, log: impl Into<String>) {
        self.compile_failures.borrow_mut().insert(stage, log.into());
    }

    /// Makes every subsequent link fail with `log`.
    pub fn fail_link(&self, log: impl Into<String>) {
        *self.link_failure.borrow_mut() = Some(log.into());
    }

    /// Makes object creation fail, like a driver out of names.
    pub fn refuse_allocation(&self, refuse: bool) {
        self.refuse_allocation.set(refuse);
    }

    // ── inspection ────────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        let mut st = self.state.borrow_mut();
        st.calls.clear();
        st.draws.clear();
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    pub fn live_objects(&self) -> usize {
        self.state.borrow().live.len()
    }

    pub fn live_of(&self, kind: ObjectKind) -> usize {
        self.state.borrow().live.values().filter(|k| **k == kind).count()
    }

    pub fn is_live(&self, handle: GpuHandle) -> bool {
        self.state.borrow().live.contains_key(&handle)
    }

    /// Total (created, deleted) object counts since construction.
    pub fn lifetime_counts(&self) -> (usize, usize) {
        let st = self.state.borrow();
        (st.created, st.deleted)
    }

    pub fn buffer_contents(&self, buffer: GpuHandle) -> Option<Vec<u8>> {
        self.state.borrow().buffer_contents.get(&buffer).cloned()
    }

    pub fn current_program(&self) -> Option<GpuHandle> {
        self.state.borrow().program
    }

    /// Element buffer captured by `array`.
    pub fn element_buffer_of(&self, array: GpuHandle) -> Option<GpuHandle> {
        self.state.borrow().vao_elements.get(&array).copied().flatten()
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn record(&self, call: GlCall) {
        self.state.borrow_mut().calls.push(call);
    }

    fn allocate(&self, kind: ObjectKind) -> Result<GpuHandle, String> {
        if self.refuse_allocation.get() {
            return Err(format!("mock driver refused to allocate {kind:?}"));
        }
        let n = self.next_name.get();
        self.next_name.set(n + 1);
        let handle = GpuHandle(NonZeroU32::new(n).ok_or_else(|| "name space exhausted".to_string())?);

        let mut st = self.state.borrow_mut();
        st.live.insert(handle, kind);
        st.created += 1;
        st.calls.push(GlCall::CreateObject(kind, handle));
        Ok(handle)
    }

    fn release(&self, kind: ObjectKind, handle: GpuHandle) {
        let mut st = self.state.borrow_mut();
        match st.live.remove(&handle) {
            Some(k) if k == kind => {}
            Some(k) => panic!("deleted {handle:?} as {kind:?} but it is a {k:?}"),
            None => panic!("double delete or unknown object {handle:?} ({kind:?})"),
        }
        st.deleted += 1;
        st.calls.push(GlCall::DeleteObject(kind, handle));
    }

    fn assert_live(&self, handle: GpuHandle, kind: ObjectKind) {
        let st = self.state.borrow();
        assert_eq!(
            st.live.get(&handle),
            Some(&kind),
            "use of dead or mistyped object {handle:?}"
        );
    }
}

/// Extracts `uniform <type> <name>;` declarations from GLSL source.
fn declared_uniforms(source: &str) -> Vec<String> {
    source
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("uniform "))
        .filter_map(|decl| {
            let decl = decl.split(';').next()?;
            let name = decl.split_whitespace().last()?;
            let name = name.split('[').next()?;
            Some(name.to_string())
        })
        .collect()
}

impl GlDevice for MockDevice {
    fn create_buffer(&self) -> Result<GpuHandle, String> {
        self.allocate(ObjectKind::Buffer)
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<GpuHandle>) {
        if let Some(b) = buffer {
            self.assert_live(b, ObjectKind::Buffer);
        }
        let mut st = self.state.borrow_mut();
        match target {
            BufferTarget::Array => st.array_buffer = buffer,
            BufferTarget::Element => match st.vertex_array {
                Some(vao) => {
                    st.vao_elements.insert(vao, buffer);
                }
                None => st.element_buffer = buffer,
            },
        }
        st.calls.push(GlCall::BindBuffer(target, buffer));
    }

    fn bound_buffer(&self, target: BufferTarget) -> Option<GpuHandle> {
        let st = self.state.borrow();
        match target {
            BufferTarget::Array => st.array_buffer,
            BufferTarget::Element => match st.vertex_array {
                Some(vao) => st.vao_elements.get(&vao).copied().flatten(),
                None => st.element_buffer,
            },
        }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) {
        let bound = self
            .bound_buffer(target)
            .unwrap_or_else(|| panic!("buffer_data with nothing bound to {target:?}"));
        let mut st = self.state.borrow_mut();
        st.buffer_contents.insert(bound, data.to_vec());
        st.calls.push(GlCall::BufferData(target, data.len()));
    }

    fn delete_buffer(&self, buffer: GpuHandle) {
        self.release(ObjectKind::Buffer, buffer);
        let mut st = self.state.borrow_mut();
        st.buffer_contents.remove(&buffer);
        // Deleting a bound buffer unbinds it, as GL does.
        if st.array_buffer == Some(buffer) {
            st.array_buffer = None;
        }
        if st.element_buffer == Some(buffer) {
            st.element_buffer = None;
        }
        for slot in st.vao_elements.values_mut() {
            if *slot == Some(buffer) {
                *slot = None;
            }
        }
    }

    fn create_vertex_array(&self) -> Result<GpuHandle, String> {
        self.allocate(ObjectKind::VertexArray)
    }

    fn bind_vertex_array(&self, array: Option<GpuHandle>) {
        if let Some(a) = array {
            self.assert_live(a, ObjectKind::VertexArray);
        }
        let mut st = self.state.borrow_mut();
        st.vertex_array = array;
        st.calls.push(GlCall::BindVertexArray(array));
    }

    fn bound_vertex_array(&self) -> Option<GpuHandle> {
        self.state.borrow().vertex_array
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
        {
            let st = self.state.borrow();
            assert!(st.vertex_array.is_some(), "attribute pointer declared with no vertex array bound");
            assert!(st.array_buffer.is_some(), "attribute pointer declared with no array buffer bound");
        }
        self.record(GlCall::VertexAttribPointer { slot, components, ty, normalized, stride, offset });
    }

    fn enable_vertex_attrib_array(&self, slot: u32) {
        self.record(GlCall::EnableVertexAttribArray(slot));
    }

    fn delete_vertex_array(&self, array: GpuHandle) {
        self.release(ObjectKind::VertexArray, array);
        let mut st = self.state.borrow_mut();
        st.vao_elements.remove(&array);
        if st.vertex_array == Some(array) {
            st.vertex_array = None;
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<GpuHandle, String> {
        self.allocate(ObjectKind::Shader(stage))
    }

    fn shader_source(&self, shader: GpuHandle, source: &str) {
        self.state.borrow_mut().shader_sources.insert(shader, source.to_string());
    }

    fn compile_shader(&self, shader: GpuHandle) {
        let stage = match self.state.borrow().live.get(&shader) {
            Some(ObjectKind::Shader(stage)) => *stage,
            other => panic!("compile of non-shader {shader:?}: {other:?}"),
        };
        let ok = !self.compile_failures.borrow().contains_key(&stage);
        let mut st = self.state.borrow_mut();
        st.compiled.insert(shader, ok);
        st.calls.push(GlCall::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: GpuHandle) -> bool {
        self.state.borrow().compiled.get(&shader).copied().unwrap_or(false)
    }

    fn shader_info_log(&self, shader: GpuHandle) -> String {
        let stage = match self.state.borrow().live.get(&shader) {
            Some(ObjectKind::Shader(stage)) => *stage,
            _ => return String::new(),
        };
        self.compile_failures.borrow().get(&stage).cloned().unwrap_or_default()
    }

    fn delete_shader(&self, shader: GpuHandle) {
        let kind = self.state.borrow().live.get(&shader).copied();
        match kind {
            Some(kind @ ObjectKind::Shader(_)) => self.release(kind, shader),
            other => panic!("delete_shader on {shader:?}: {other:?}"),
        }
        let mut st = self.state.borrow_mut();
        st.shader_sources.remove(&shader);
        st.compiled.remove(&shader);
    }

    fn create_program(&self) -> Result<GpuHandle, String> {
        self.allocate(ObjectKind::Program)
    }

    fn attach_shader(&self, program: GpuHandle, shader: GpuHandle) {
        self.assert_live(program, ObjectKind::Program);
        let mut st = self.state.borrow_mut();
        st.attached.entry(program).or_default().push(shader);
        st.calls.push(GlCall::AttachShader(program, shader));
    }

    fn detach_shader(&self, program: GpuHandle, shader: GpuHandle) {
        let mut st = self.state.borrow_mut();
        if let Some(list) = st.attached.get_mut(&program) {
            list.retain(|s| *s != shader);
        }
        st.calls.push(GlCall::DetachShader(program, shader));
    }

    fn link_program(&self, program: GpuHandle) {
        self.assert_live(program, ObjectKind::Program);
        let failed = self.link_failure.borrow().is_some();
        let mut st = self.state.borrow_mut();
        let attached = st.attached.get(&program).cloned().unwrap_or_default();
        let all_compiled = attached.len() == 2
            && attached.iter().all(|s| st.compiled.get(s).copied().unwrap_or(false));
        let ok = !failed && all_compiled;

        let uniforms = if ok {
            attached
                .iter()
                .filter_map(|s| st.shader_sources.get(s))
                .flat_map(|src| declared_uniforms(src))
                .collect()
        } else {
            Vec::new()
        };
        st.uniforms.insert(program, uniforms);
        st.linked.insert(program, ok);
        st.calls.push(GlCall::LinkProgram(program));
    }

    fn program_link_status(&self, program: GpuHandle) -> bool {
        self.state.borrow().linked.get(&program).copied().unwrap_or(false)
    }

    fn program_info_log(&self, _program: GpuHandle) -> String {
        self.link_failure
            .borrow()
            .clone()
            .unwrap_or_else(|| "error: shader stage did not compile".to_string())
    }

    fn use_program(&self, program: Option<GpuHandle>) {
        if let Some(p) = program {
            self.assert_live(p, ObjectKind::Program);
            assert!(self.program_link_status(p), "use of unlinked program {p:?}");
        }
        let mut st = self.state.borrow_mut();
        st.program = program;
        st.calls.push(GlCall::UseProgram(program));
    }

    fn delete_program(&self, program: GpuHandle) {
        self.release(ObjectKind::Program, program);
        let mut st = self.state.borrow_mut();
        st.attached.remove(&program);
        st.linked.remove(&program);
        st.uniforms.remove(&program);
        if st.program == Some(program) {
            st.program = None;
        }
    }

    fn uniform_location(&self, program: GpuHandle, name: &str) -> Option<UniformLocation> {
        self.assert_live(program, ObjectKind::Program);
        let st = self.state.borrow();
        st.uniforms
            .get(&program)?
            .iter()
            .position(|u| u == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        assert!(self.state.borrow().program.is_some(), "uniform upload with no program active");
        self.record(GlCall::SetUniform(location, *value));
    }

    fn create_texture(&self) -> Result<GpuHandle, String> {
        self.allocate(ObjectKind::Texture)
    }

    fn active_texture(&self, unit: u32) {
        let mut st = self.state.borrow_mut();
        st.active_unit = unit;
        st.calls.push(GlCall::ActiveTexture(unit));
    }

    fn active_texture_unit(&self) -> u32 {
        self.state.borrow().active_unit
    }

    fn bound_texture(&self) -> Option<GpuHandle> {
        let st = self.state.borrow();
        st.textures.get(&st.active_unit).copied().flatten()
    }

    fn bind_texture(&self, texture: Option<GpuHandle>) {
        if let Some(t) = texture {
            self.assert_live(t, ObjectKind::Texture);
        }
        let mut st = self.state.borrow_mut();
        let unit = st.active_unit;
        st.textures.insert(unit, texture);
        st.calls.push(GlCall::BindTexture(texture));
    }

    fn tex_image_2d(&self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]) {
        let expected = width as usize * height as usize * format.channels() as usize;
        assert_eq!(pixels.len(), expected, "pixel data does not match {width}x{height} {format:?}");
        self.record(GlCall::TexImage2d { width, height, format, len: pixels.len() });
    }

    fn tex_parameters(&self, min: Filter, mag: Filter, wrap: Wrap, mipmaps: bool) {
        self.record(GlCall::TexParameters { min, mag, wrap, mipmaps });
    }

    fn generate_mipmap(&self) {
        self.record(GlCall::GenerateMipmap);
    }

    fn delete_texture(&self, texture: GpuHandle) {
        self.release(ObjectKind::Texture, texture);
        let mut st = self.state.borrow_mut();
        for slot in st.textures.values_mut() {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.record(GlCall::Viewport(x, y, width, height));
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(GlCall::ClearColor([r, g, b, a]));
    }

    fn clear(&self) {
        self.record(GlCall::Clear);
    }

    fn draw_elements(&self, topology: Topology, count: u32, format: IndexFormat, offset: u32) {
        let mut st = self.state.borrow_mut();
        let vertex_array = st.vertex_array;
        let element_buffer = vertex_array.and_then(|v| st.vao_elements.get(&v).copied().flatten());
        let program = st.program;
        st.draws.push(DrawRecord {
            topology,
            count,
            format,
            offset,
            program,
            vertex_array,
            element_buffer,
        });
        st.calls.push(GlCall::DrawElements { topology, count, format, offset });
    }
}
