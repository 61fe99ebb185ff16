use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::device::GlDevice;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// The runtime guarantees the order `on_init` → `on_frame`* → `on_exit`, with
/// `on_exit` called exactly once while the context is still current, including
/// after a failed `on_init`.
pub trait App {
    /// Creates GPU resources. An error aborts the runtime.
    fn on_init(&mut self, gl: &dyn GlDevice) -> anyhow::Result<()>;

    /// Called for window events.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl;

    /// Releases every GPU resource the app owns.
    fn on_exit(&mut self, gl: &dyn GlDevice);
}
