//! Built-in figures.
//!
//! NDC figures (`triforce`, `triangle`, `outline`) are drawn with an identity
//! projection. Pixel-space figures (`square`, `textured`) are laid out on an
//! 800×800 design canvas and go through the ortho projection.

use clap::ValueEnum;
use plotalot_engine::device::Topology;
use plotalot_engine::render::VertexAttribute;

/// Figure selected on the command line.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum Shape {
    /// Three triangles cut out of one (6 vertices, 9 indices).
    Triforce,
    /// One equilateral triangle.
    Triangle,
    /// Edges of the triforce drawn as lines.
    Outline,
    /// Solid square in pixel coordinates.
    Square,
    /// Texture-mapped square in pixel coordinates.
    Textured,
}

impl Shape {
    pub fn is_textured(self) -> bool {
        self == Shape::Textured
    }

    /// Whether vertices are in pixels and need the ortho projection.
    pub fn pixel_space(self) -> bool {
        matches!(self, Shape::Square | Shape::Textured)
    }

    pub fn topology(self) -> Topology {
        match self {
            Shape::Outline => Topology::Lines,
            _ => Topology::Triangles,
        }
    }

    /// Vertex and fragment shader names.
    pub fn shaders(self) -> (&'static str, &'static str) {
        if self.is_textured() {
            ("textured.vert", "textured.frag")
        } else {
            ("default.vert", "default.frag")
        }
    }
}

/// CPU-side mesh for one figure.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub attributes: Vec<VertexAttribute>,
    pub topology: Topology,
}

// ── NDC figures ───────────────────────────────────────────────────────────

const SQRT_3: f32 = 1.732_050_8;

/// Outer corners then inner edge midpoints.
fn triforce_vertices() -> Vec<f32> {
    vec![
        -0.5, -0.5 * SQRT_3 / 3.0, 0.0, // lower left
        0.5, -0.5 * SQRT_3 / 3.0, 0.0, // lower right
        0.0, 0.5 * SQRT_3 * 2.0 / 3.0, 0.0, // top
        -0.5 / 2.0, 0.5 * SQRT_3 / 6.0, 0.0, // inner left
        0.5 / 2.0, 0.5 * SQRT_3 / 6.0, 0.0, // inner right
        0.0, -0.5 * SQRT_3 / 3.0, 0.0, // inner bottom
    ]
}

fn xyz() -> Vec<VertexAttribute> {
    vec![VertexAttribute::floats(0, 3, 12, 0)]
}

fn triforce() -> Geometry {
    Geometry {
        vertices: triforce_vertices(),
        indices: vec![
            0, 3, 5, // lower left
            3, 2, 4, // top
            5, 4, 1, // lower right
        ],
        attributes: xyz(),
        topology: Topology::Triangles,
    }
}

fn triangle() -> Geometry {
    Geometry {
        vertices: vec![
            -0.5, -0.2887, 0.0, //
            0.5, -0.2887, 0.0, //
            0.0, 0.5774, 0.0,
        ],
        indices: vec![0, 1, 2],
        attributes: xyz(),
        topology: Topology::Triangles,
    }
}

fn outline() -> Geometry {
    Geometry {
        vertices: triforce_vertices(),
        indices: vec![
            0, 3, 3, 5, 5, 0, // lower left
            3, 2, 2, 4, 4, 3, // top
            5, 4, 4, 1, 1, 5, // lower right
        ],
        attributes: xyz(),
        topology: Topology::Lines,
    }
}

// ── pixel-space figures ───────────────────────────────────────────────────

/// Square from (200, 200) to (600, 600).
fn square() -> Geometry {
    Geometry {
        vertices: vec![
            200.0, 200.0, 0.0, //
            600.0, 200.0, 0.0, //
            600.0, 600.0, 0.0, //
            200.0, 600.0, 0.0,
        ],
        indices: vec![0, 1, 2, 2, 3, 0],
        attributes: xyz(),
        topology: Topology::Triangles,
    }
}

/// Square with interleaved `x, y, u, v` vertices.
fn textured() -> Geometry {
    Geometry {
        vertices: vec![
            200.0, 200.0, 0.0, 0.0, //
            600.0, 200.0, 1.0, 0.0, //
            600.0, 600.0, 1.0, 1.0, //
            200.0, 600.0, 0.0, 1.0,
        ],
        indices: vec![0, 1, 2, 2, 3, 0],
        attributes: vec![
            VertexAttribute::floats(0, 2, 16, 0),
            VertexAttribute::floats(1, 2, 16, 8),
        ],
        topology: Topology::Triangles,
    }
}

pub fn geometry(shape: Shape) -> Geometry {
    match shape {
        Shape::Triforce => triforce(),
        Shape::Triangle => triangle(),
        Shape::Outline => outline(),
        Shape::Square => square(),
        Shape::Textured => textured(),
    }
}

/// `size × size` RGB checkerboard with `cell`-pixel squares.
pub fn checkerboard(size: u32, cell: u32) -> Vec<u8> {
    let cell = cell.max(1);
    let mut bytes = Vec::with_capacity((size * size * 3) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let v = if light { 230 } else { 40 };
            bytes.extend_from_slice(&[v, v, v]);
        }
    }
    bytes
}
