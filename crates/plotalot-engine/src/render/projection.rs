use glam::{Mat4, Vec2, Vec4};

use crate::coords::Viewport;
use crate::device::UniformValue;

/// Orthographic pixel-space → NDC mapping.
///
/// `[0, width] × [0, height]` (origin bottom-left, +Y up) maps onto `[-1, 1]²`
/// with a depth range of `[-1, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrthoProjection {
    matrix: Mat4,
}

impl OrthoProjection {
    pub fn pixel_space(viewport: Viewport) -> Self {
        let w = viewport.width.max(1) as f32;
        let h = viewport.height.max(1) as f32;
        Self {
            matrix: Mat4::orthographic_rh_gl(0.0, w, 0.0, h, -1.0, 1.0),
        }
    }

    #[inline]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Projects a pixel-space point to normalized device coordinates.
    pub fn to_ndc(&self, p: Vec2) -> Vec2 {
        let clip = self.matrix * Vec4::new(p.x, p.y, 0.0, 1.0);
        Vec2::new(clip.x, clip.y) / clip.w
    }
}

impl From<OrthoProjection> for UniformValue {
    fn from(p: OrthoProjection) -> Self {
        p.matrix.into()
    }
}
