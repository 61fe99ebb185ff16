use anyhow::{Context, Result};
use glam::Mat4;

use plotalot_engine::assets::AssetResolver;
use plotalot_engine::coords::Viewport;
use plotalot_engine::core::{App, AppControl, FrameCtx};
use plotalot_engine::device::{Filter, GlDevice};
use plotalot_engine::render::{
    Draw, FrameRenderer, IndexBuffer, OrthoProjection, ShaderProgram, Texture, TextureParams, TexturePixels,
    VertexArray, VertexBuffer,
};

use crate::shapes::{self, Shape};

/// GPU objects of the figure, filled one by one so a failed setup can still
/// release what was created.
#[derive(Default)]
struct Resources {
    program: Option<ShaderProgram>,
    vertices: Option<VertexBuffer>,
    indices: Option<IndexBuffer>,
    layout: Option<VertexArray>,
    texture: Option<Texture>,
}

impl Resources {
    fn release(&mut self, gl: &dyn GlDevice) {
        // Array first: it references the buffers.
        if let Some(layout) = self.layout.take() {
            layout.release(gl);
        }
        if let Some(indices) = self.indices.take() {
            indices.release(gl);
        }
        if let Some(vertices) = self.vertices.take() {
            vertices.release(gl);
        }
        if let Some(texture) = self.texture.take() {
            texture.release(gl);
        }
        if let Some(program) = self.program.take() {
            program.release(gl);
        }
    }
}

pub struct StudioApp {
    shape: Shape,
    texture_name: Option<String>,
    shaders: AssetResolver,
    textures: AssetResolver,
    renderer: FrameRenderer,
    res: Resources,
}

impl StudioApp {
    pub fn new(shape: Shape, texture_name: Option<String>, shaders: AssetResolver, textures: AssetResolver) -> Self {
        Self {
            shape,
            texture_name,
            shaders,
            textures,
            renderer: FrameRenderer::new(),
            res: Resources::default(),
        }
    }

    fn load_texture(&self, gl: &dyn GlDevice) -> Result<Texture> {
        match &self.texture_name {
            Some(name) => Texture::load(gl, &self.textures, name, TextureParams::default())
                .with_context(|| format!("failed to load texture '{name}'")),
            None => {
                let pixels = TexturePixels {
                    bytes: shapes::checkerboard(64, 8),
                    width: 64,
                    height: 64,
                    channels: 3,
                };
                let params = TextureParams {
                    min_filter: Filter::Nearest,
                    mag_filter: Filter::Nearest,
                    ..TextureParams::default()
                };
                Texture::from_pixels(gl, &pixels, params).context("failed to create checkerboard texture")
            }
        }
    }
}

/// Projection uniform for `shape`.
///
/// Pixel-space figures are laid out in logical pixels, so the mapping follows the
/// window's logical size rather than the framebuffer's.
fn projection_for(shape: Shape, logical: (f32, f32)) -> Mat4 {
    if !shape.pixel_space() {
        return Mat4::IDENTITY;
    }
    let (w, h) = logical;
    OrthoProjection::pixel_space(Viewport::new(w.round() as u32, h.round() as u32)).matrix()
}

impl App for StudioApp {
    fn on_init(&mut self, gl: &dyn GlDevice) -> Result<()> {
        let (vert, frag) = self.shape.shaders();
        self.res.program = Some(
            ShaderProgram::from_files(gl, &self.shaders, vert, frag)
                .with_context(|| format!("failed to build shader program {vert} + {frag}"))?,
        );

        let geometry = shapes::geometry(self.shape);
        let vertices = self.res.vertices.insert(VertexBuffer::new(gl, &geometry.vertices)?);
        let indices = self.res.indices.insert(IndexBuffer::new(gl, &geometry.indices)?);
        let layout = self.res.layout.insert(VertexArray::new(gl)?);

        for attr in &geometry.attributes {
            layout.link_attribute(gl, vertices, *attr)?;
        }
        layout
            .set_index_buffer(gl, indices)
            .context("index buffer does not fit the vertex data")?;

        log::info!(
            "{:?}: {} vertices, {} indices, {:?}",
            self.shape,
            layout.vertex_count().unwrap_or(0),
            layout.index_count(),
            geometry.topology
        );

        if self.shape.is_textured() {
            let texture = self.load_texture(gl)?;
            self.res.texture = Some(texture);
        }
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        let (Some(program), Some(layout)) = (&self.res.program, &self.res.layout) else {
            return AppControl::Exit;
        };

        let projection = projection_for(self.shape, ctx.window.logical_size());
        let mut draw = Draw::new(program, layout, self.shape.topology()).uniform("projection", projection);
        if let Some(texture) = &self.res.texture {
            draw = draw.texture(0, texture).uniform("tex0", 0i32);
        }

        ctx.render(&mut self.renderer, &draw)
    }

    fn on_exit(&mut self, gl: &dyn GlDevice) {
        log::info!("releasing GPU resources after {} frames", self.renderer.frames_rendered());
        self.res.release(gl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotalot_engine::device::{MockDevice, ObjectKind};

    fn resolvers(root: &std::path::Path) -> (AssetResolver, AssetResolver) {
        (
            AssetResolver::shaders()
                .with_working_dir(env!("CARGO_MANIFEST_DIR"))
                .without_exe_dir(),
            AssetResolver::textures().with_working_dir(root).without_exe_dir(),
        )
    }

    #[test]
    fn every_shape_sets_up_and_releases_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        for shape in [
            Shape::Triforce,
            Shape::Triangle,
            Shape::Outline,
            Shape::Square,
            Shape::Textured,
        ] {
            let gl = MockDevice::new();
            let (shaders, textures) = resolvers(dir.path());
            let mut app = StudioApp::new(shape, None, shaders, textures);

            app.on_init(&gl).unwrap();
            assert_eq!(gl.live_of(ObjectKind::Program), 1);
            assert_eq!(gl.live_of(ObjectKind::Texture), usize::from(shape.is_textured()));

            app.on_exit(&gl);
            assert_eq!(gl.live_objects(), 0, "{shape:?} leaked objects");
        }
    }

    #[test]
    fn pixel_figures_follow_the_logical_canvas() {
        // 800x800 logical on a 2x display: the framebuffer is 1600x1600.
        let m = projection_for(Shape::Square, (800.0, 800.0));
        let corner = m * glam::Vec4::new(600.0, 600.0, 0.0, 1.0);
        assert!((corner.x - 0.5).abs() < 1e-6 && (corner.y - 0.5).abs() < 1e-6);

        assert_eq!(projection_for(Shape::Triforce, (800.0, 800.0)), Mat4::IDENTITY);
    }

    #[test]
    fn failed_init_releases_partial_resources() {
        let dir = tempfile::tempdir().unwrap();
        let gl = MockDevice::new();
        let (shaders, textures) = resolvers(dir.path());
        let mut app = StudioApp::new(Shape::Textured, Some("missing.png".into()), shaders, textures);

        let err = app.on_init(&gl).unwrap_err();
        assert!(format!("{err:#}").contains("missing.png"));
        assert!(gl.live_objects() > 0);

        app.on_exit(&gl);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn missing_shader_fails_init() {
        let dir = tempfile::tempdir().unwrap();
        let gl = MockDevice::new();
        let mut app = StudioApp::new(
            Shape::Triforce,
            None,
            AssetResolver::new("Nowhere").with_working_dir(dir.path()).without_exe_dir(),
            AssetResolver::textures().without_exe_dir(),
        );
        assert!(app.on_init(&gl).is_err());
        app.on_exit(&gl);
        assert_eq!(gl.live_objects(), 0);
    }
}
