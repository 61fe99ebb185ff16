//! Full setup → frames → release cycle against the recording device.

use std::fs;

use glam::Vec2;
use plotalot_engine::assets::AssetResolver;
use plotalot_engine::coords::Viewport;
use plotalot_engine::device::{GlCall, MockDevice, ObjectKind, Topology};
use plotalot_engine::render::{
    Draw, FrameRenderer, FrameTarget, IndexBuffer, OrthoProjection, ShaderProgram, Texture, TextureParams,
    TexturePixels, VertexArray, VertexAttribute, VertexBuffer,
};
use plotalot_engine::{RenderError, Result};

const VERT: &str = "#version 330 core
layout (location = 0) in vec2 aPos;
layout (location = 1) in vec2 aTex;
out vec2 texCoord;
uniform mat4 projection;
void main() { gl_Position = projection * vec4(aPos, 0.0, 1.0); texCoord = aTex; }
";

const FRAG: &str = "#version 330 core
in vec2 texCoord;
out vec4 FragColor;
uniform sampler2D tex0;
void main() { FragColor = texture(tex0, texCoord); }
";

struct Window {
    size: Viewport,
    close_after: u32,
    presented: u32,
}

impl FrameTarget for Window {
    fn should_close(&self) -> bool {
        self.presented >= self.close_after
    }

    fn viewport(&self) -> Viewport {
        self.size
    }

    fn present(&mut self) -> Result<()> {
        self.presented += 1;
        Ok(())
    }
}

fn shader_dir() -> (tempfile::TempDir, AssetResolver) {
    let dir = tempfile::tempdir().unwrap();
    let shaders = dir.path().join("Resource_Files").join("Shaders");
    fs::create_dir_all(&shaders).unwrap();
    fs::write(shaders.join("textured.vert"), VERT).unwrap();
    fs::write(shaders.join("textured.frag"), FRAG).unwrap();
    let resolver = AssetResolver::shaders().with_working_dir(dir.path()).without_exe_dir();
    (dir, resolver)
}

#[test]
fn textured_quad_renders_and_releases_everything() {
    let gl = MockDevice::new();
    let (_dir, resolver) = shader_dir();

    let program = ShaderProgram::from_files(&gl, &resolver, "textured.vert", "textured.frag").unwrap();

    #[rustfmt::skip]
    let quad: [f32; 16] = [
        200.0, 200.0, 0.0, 0.0,
        600.0, 200.0, 1.0, 0.0,
        600.0, 600.0, 1.0, 1.0,
        200.0, 600.0, 0.0, 1.0,
    ];
    let vbo = VertexBuffer::new(&gl, &quad).unwrap();
    let ibo = IndexBuffer::new(&gl, &[0u16, 1, 2, 2, 3, 0]).unwrap();
    let mut vao = VertexArray::new(&gl).unwrap();
    assert_eq!(vao.link_attribute(&gl, &vbo, VertexAttribute::floats(0, 2, 16, 0)).unwrap(), 4);
    assert_eq!(vao.link_attribute(&gl, &vbo, VertexAttribute::floats(1, 2, 16, 8)).unwrap(), 4);
    vao.set_index_buffer(&gl, &ibo).unwrap();

    let texture = Texture::from_pixels(
        &gl,
        &TexturePixels {
            bytes: vec![255; 2 * 2 * 4],
            width: 2,
            height: 2,
            channels: 4,
        },
        TextureParams::default(),
    )
    .unwrap();

    let mut window = Window {
        size: Viewport::new(800, 800),
        close_after: 5,
        presented: 0,
    };
    let projection = OrthoProjection::pixel_space(window.viewport());
    assert!((projection.to_ndc(Vec2::new(200.0, 200.0)) - Vec2::new(-0.5, -0.5)).length() < 1e-6);

    let draw = Draw::new(&program, &vao, Topology::Triangles)
        .uniform("projection", projection)
        .uniform("tex0", 0i32)
        .texture(0, &texture);

    let mut renderer = FrameRenderer::new();
    assert_eq!(renderer.run_until_closed(&gl, &mut window, &draw).unwrap(), 5);

    let draws = gl.draws();
    assert_eq!(draws.len(), 5);
    assert!(draws.iter().all(|d| d.count == 6
        && d.program == Some(program.handle())
        && d.element_buffer == Some(ibo.handle())));
    let uploads = gl
        .calls()
        .iter()
        .filter(|c| matches!(c, GlCall::SetUniform(..)))
        .count();
    assert_eq!(uploads, 10);

    texture.release(&gl);
    vao.release(&gl);
    ibo.release(&gl);
    vbo.release(&gl);
    program.release(&gl);

    assert_eq!(gl.live_objects(), 0);
    let (created, deleted) = gl.lifetime_counts();
    assert_eq!(created, deleted);
}

#[test]
fn failed_setup_leaves_no_objects() {
    let gl = MockDevice::new();
    let (_dir, resolver) = shader_dir();
    gl.fail_link("error: fragment input texCoord not written");

    let err = ShaderProgram::from_files(&gl, &resolver, "textured.vert", "textured.frag")
        .err()
        .unwrap();
    assert!(matches!(err, RenderError::ShaderLink { .. }));
    assert!(err.to_string().contains("texCoord"));
    assert_eq!(gl.live_objects(), 0);
    assert_eq!(gl.live_of(ObjectKind::Shader(plotalot_engine::ShaderStage::Vertex)), 0);
}

#[test]
fn out_of_range_indices_never_reach_the_driver() {
    let gl = MockDevice::new();
    // Two vertices of 3 floats, but indices reach vertex 2.
    let vbo = VertexBuffer::new(&gl, &[0.0f32; 6]).unwrap();
    let ibo = IndexBuffer::new(&gl, &[0u32, 1, 2]).unwrap();
    let mut vao = VertexArray::new(&gl).unwrap();
    vao.link_attribute(&gl, &vbo, VertexAttribute::floats(0, 3, 0, 0)).unwrap();

    assert!(matches!(
        vao.set_index_buffer(&gl, &ibo),
        Err(RenderError::IndexOutOfRange { max_index: 2, vertex_count: 2 })
    ));
    assert!(matches!(vao.draw(&gl, Topology::Triangles), Err(RenderError::MissingIndexBuffer)));
    assert!(gl.draws().is_empty());

    vao.release(&gl);
    ibo.release(&gl);
    vbo.release(&gl);
}
