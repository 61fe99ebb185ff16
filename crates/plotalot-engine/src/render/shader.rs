use std::cell::RefCell;
use std::collections::HashMap;

use crate::assets::AssetResolver;
use crate::device::{GlDevice, GpuHandle, UniformLocation, UniformValue};
use crate::error::{RenderError, Result, ShaderStage};

/// A linked two-stage GPU program.
///
/// Stage shader objects only live inside [`ShaderProgram::new`]; the program keeps
/// its own handle plus a cache of uniform lookups (including misses).
pub struct ShaderProgram {
    handle: GpuHandle,
    uniforms: RefCell<HashMap<String, Option<UniformLocation>>>,
    released: bool,
}

impl ShaderProgram {
    /// Compiles both stages and links them.
    ///
    /// On failure the driver's info log is returned and no shader or program
    /// object created here stays alive.
    pub fn new(gl: &dyn GlDevice, vertex_src: &str, fragment_src: &str) -> Result<Self> {
        let vertex = compile_stage(gl, ShaderStage::Vertex, vertex_src)?;
        let fragment = match compile_stage(gl, ShaderStage::Fragment, fragment_src) {
            Ok(f) => f,
            Err(e) => {
                gl.delete_shader(vertex);
                return Err(e);
            }
        };

        let linked = link(gl, vertex, fragment);

        gl.delete_shader(vertex);
        gl.delete_shader(fragment);

        let handle = linked?;
        log::debug!("shader program {} linked", handle.get());
        Ok(Self {
            handle,
            uniforms: RefCell::new(HashMap::new()),
            released: false,
        })
    }

    /// Loads both stage sources through `resolver` and builds the program.
    pub fn from_files(
        gl: &dyn GlDevice,
        resolver: &AssetResolver,
        vertex_name: &str,
        fragment_name: &str,
    ) -> Result<Self> {
        let vertex_src = resolver.resolve_text(vertex_name)?;
        let fragment_src = resolver.resolve_text(fragment_name)?;
        log::info!("building shader program from '{vertex_name}' + '{fragment_name}'");
        Self::new(gl, &vertex_src, &fragment_src)
    }

    #[inline]
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Makes this the current program for subsequent draws and uniform uploads.
    pub fn activate(&self, gl: &dyn GlDevice) {
        gl.use_program(Some(self.handle));
    }

    /// Location of uniform `name`, or `None` if the program does not use it.
    pub fn uniform_location(&self, gl: &dyn GlDevice, name: &str) -> Option<UniformLocation> {
        if let Some(cached) = self.uniforms.borrow().get(name) {
            return *cached;
        }
        let location = gl.uniform_location(self.handle, name);
        if location.is_none() {
            log::debug!("program {}: no active uniform '{}'", self.handle.get(), name);
        }
        self.uniforms.borrow_mut().insert(name.to_string(), location);
        location
    }

    /// Uploads `value` to uniform `name` of the current program.
    ///
    /// The program must already be active. Returns `false` (and uploads nothing)
    /// when the uniform is absent.
    pub fn set_uniform(&self, gl: &dyn GlDevice, name: &str, value: impl Into<UniformValue>) -> bool {
        match self.uniform_location(gl, name) {
            Some(location) => {
                gl.set_uniform(location, &value.into());
                true
            }
            None => false,
        }
    }

    /// Deletes the program.
    pub fn release(mut self, gl: &dyn GlDevice) {
        gl.delete_program(self.handle);
        self.released = true;
        log::debug!("shader program {} released", self.handle.get());
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("shader program {} dropped without release", self.handle.get());
        }
    }
}

fn compile_stage(gl: &dyn GlDevice, stage: ShaderStage, source: &str) -> Result<GpuHandle> {
    let shader = gl.create_shader(stage).map_err(RenderError::Driver)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.shader_compile_status(shader) {
        let log = gl.shader_info_log(shader);
        gl.delete_shader(shader);
        log::error!("{stage} shader failed to compile:\n{log}");
        return Err(RenderError::ShaderCompile { stage, log });
    }
    Ok(shader)
}

fn link(gl: &dyn GlDevice, vertex: GpuHandle, fragment: GpuHandle) -> Result<GpuHandle> {
    let program = gl.create_program().map_err(RenderError::Driver)?;
    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);

    let ok = gl.program_link_status(program);
    gl.detach_shader(program, vertex);
    gl.detach_shader(program, fragment);

    if !ok {
        let log = gl.program_info_log(program);
        gl.delete_program(program);
        log::error!("shader program failed to link:\n{log}");
        return Err(RenderError::ShaderLink { log });
    }
    Ok(program)
}
