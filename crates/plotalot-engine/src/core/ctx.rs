use winit::window::{Window, WindowId};

use crate::coords::Viewport;
use crate::device::GlDevice;
use crate::error::RenderError;
use crate::render::{Draw, FrameRenderer, FrameStats, FrameTarget};

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Returns the logical window size as `(width, height)` in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let phys = self.window.inner_size();
        let logi: winit::dpi::LogicalSize<f64> = phys.to_logical(self.window.scale_factor());
        (logi.width as f32, logi.height as f32)
    }
}

/// Per-frame context passed to `core::App::on_frame`.
pub struct FrameCtx<'a> {
    pub window: WindowCtx<'a>,
    pub gl: &'a dyn GlDevice,
    pub target: &'a mut dyn FrameTarget,
    /// Redraws delivered so far, starting at 0.
    pub frame_index: u64,
}

impl FrameCtx<'_> {
    /// Drawable size in framebuffer pixels.
    pub fn viewport(&self) -> Viewport {
        self.target.viewport()
    }

    /// Runs one full frame of `draw` through `renderer` and presents it.
    ///
    /// A failed present skips the frame. Any other error ends the app.
    pub fn render(&mut self, renderer: &mut FrameRenderer, draw: &Draw<'_>) -> AppControl {
        self.window.window.pre_present_notify();
        match renderer.render_frame(self.gl, self.target, draw) {
            Ok(stats) => {
                log_stats(&stats);
                AppControl::Continue
            }
            Err(RenderError::Present(reason)) => {
                log::warn!("frame {} not presented: {}", self.frame_index, reason);
                AppControl::Continue
            }
            Err(e) => {
                log::error!("frame {} failed: {}", self.frame_index, e);
                AppControl::Exit
            }
        }
    }
}

fn log_stats(stats: &FrameStats) {
    if stats.frame_index == 0 {
        log::info!(
            "first frame: {} indices, {} uniforms uploaded, {} skipped",
            stats.index_count,
            stats.uploaded_uniforms,
            stats.skipped_uniforms
        );
    } else {
        log::trace!("{stats:?}");
    }
}
