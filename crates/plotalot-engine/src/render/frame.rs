//! Per-frame orchestration.
//!
//! One frame is: set viewport and clear, then for each draw activate the program,
//! upload uniforms, bind textures and the vertex array, issue the indexed draw;
//! finally present. [`FrameRenderer::render_frame`] runs the whole sequence for a
//! single [`Draw`].

use crate::coords::{ColorRgba, Viewport};
use crate::device::{GlDevice, Topology, UniformValue};
use crate::error::{RenderError, Result};

use super::shader::ShaderProgram;
use super::texture::Texture;
use super::vertex_array::VertexArray;

/// Windowing collaborator seen by the renderer.
pub trait FrameTarget {
    /// `true` once the user asked to close the window.
    fn should_close(&self) -> bool;

    /// Current drawable size.
    fn viewport(&self) -> Viewport;

    /// Shows the finished frame (buffer swap).
    fn present(&mut self) -> Result<()>;
}

/// Everything one indexed draw call needs.
pub struct Draw<'a> {
    pub program: &'a ShaderProgram,
    pub vertex_array: &'a VertexArray,
    pub topology: Topology,
    pub uniforms: Vec<(&'a str, UniformValue)>,
    pub textures: Vec<(u32, &'a Texture)>,
}

impl<'a> Draw<'a> {
    pub fn new(program: &'a ShaderProgram, vertex_array: &'a VertexArray, topology: Topology) -> Self {
        Self {
            program,
            vertex_array,
            topology,
            uniforms: Vec::new(),
            textures: Vec::new(),
        }
    }

    pub fn uniform(mut self, name: &'a str, value: impl Into<UniformValue>) -> Self {
        self.uniforms.push((name, value.into()));
        self
    }

    pub fn texture(mut self, unit: u32, texture: &'a Texture) -> Self {
        self.textures.push((unit, texture));
        self
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameState {
    Idle,
    Rendering,
}

/// What a single frame did.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    /// 0-based index of the frame.
    pub frame_index: u64,
    /// Indices submitted across all draws of the frame.
    pub index_count: u32,
    pub uploaded_uniforms: u32,
    /// Uniforms the program does not declare; skipped without failing the frame.
    pub skipped_uniforms: u32,
}

/// Frame state machine: `Idle → Rendering → Idle`.
pub struct FrameRenderer {
    clear_color: ColorRgba,
    state: FrameState,
    current: FrameStats,
    frames: u64,
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self {
            clear_color: ColorRgba::slate(),
            state: FrameState::Idle,
            current: FrameStats::default(),
            frames: 0,
        }
    }

    pub fn with_clear_color(mut self, color: ColorRgba) -> Self {
        self.clear_color = color;
        self
    }

    pub fn clear_color(&self) -> ColorRgba {
        self.clear_color
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Frames presented so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Enters `Rendering`, sets the viewport and clears the color target.
    pub fn begin_frame(&mut self, gl: &dyn GlDevice, viewport: Viewport) -> Result<()> {
        if self.state == FrameState::Rendering {
            return Err(RenderError::FrameInProgress);
        }
        self.state = FrameState::Rendering;
        self.current = FrameStats {
            frame_index: self.frames,
            ..FrameStats::default()
        };

        let c = self.clear_color;
        gl.viewport(0, 0, viewport.width, viewport.height);
        gl.clear_color(c.r, c.g, c.b, c.a);
        gl.clear();
        Ok(())
    }

    /// Issues one draw into the frame in progress.
    pub fn draw(&mut self, gl: &dyn GlDevice, draw: &Draw<'_>) -> Result<()> {
        if self.state != FrameState::Rendering {
            return Err(RenderError::FrameNotStarted);
        }

        draw.program.activate(gl);

        for (name, value) in &draw.uniforms {
            if draw.program.set_uniform(gl, name, *value) {
                self.current.uploaded_uniforms += 1;
            } else {
                log::debug!("frame {}: skipping absent uniform '{}'", self.current.frame_index, name);
                self.current.skipped_uniforms += 1;
            }
        }

        for (unit, texture) in &draw.textures {
            texture.bind(gl, *unit);
        }

        self.current.index_count += draw.vertex_array.draw(gl, draw.topology)?;
        Ok(())
    }

    /// Presents the frame and returns to `Idle`, whether or not presenting succeeds.
    pub fn end_frame(&mut self, target: &mut dyn FrameTarget) -> Result<FrameStats> {
        if self.state != FrameState::Rendering {
            return Err(RenderError::FrameNotStarted);
        }
        self.state = FrameState::Idle;
        self.frames += 1;
        target.present()?;
        Ok(self.current)
    }

    /// Leaves a frame that failed half-way, without presenting it.
    pub fn abort_frame(&mut self) {
        if self.state == FrameState::Rendering {
            log::warn!("frame {} aborted", self.current.frame_index);
        }
        self.state = FrameState::Idle;
    }

    /// Clear, draw once, present.
    pub fn render_frame(
        &mut self,
        gl: &dyn GlDevice,
        target: &mut dyn FrameTarget,
        draw: &Draw<'_>,
    ) -> Result<FrameStats> {
        self.begin_frame(gl, target.viewport())?;
        if let Err(e) = self.draw(gl, draw) {
            self.abort_frame();
            return Err(e);
        }
        self.end_frame(target)
    }

    /// Renders `draw` every frame until the target asks to close.
    ///
    /// Returns the number of frames rendered by this call.
    pub fn run_until_closed(
        &mut self,
        gl: &dyn GlDevice,
        target: &mut dyn FrameTarget,
        draw: &Draw<'_>,
    ) -> Result<u64> {
        let mut rendered = 0;
        while !target.should_close() {
            self.render_frame(gl, target, draw)?;
            rendered += 1;
        }
        log::info!("target closed after {rendered} frames");
        Ok(rendered)
    }
}
