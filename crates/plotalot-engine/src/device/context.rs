use std::num::NonZeroU32;

use glow::HasContext as _;
use glutin::config::{ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext, Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

use super::ContextInit;
use crate::coords::Viewport;
use crate::error::{RenderError, Result};
use crate::render::FrameTarget;

fn init_err(what: &str, e: impl std::fmt::Display) -> RenderError {
    RenderError::ContextInit(format!("{what}: {e}"))
}

/// Presentation half of a [`GlContext`]: the window surface plus the current context.
///
/// Kept apart from the `glow::Context` so a frame can borrow the device and the
/// present target at the same time.
pub struct SurfacePresenter {
    context: PossiblyCurrentContext,
    surface: Surface<WindowSurface>,
    size: PhysicalSize<u32>,
    close_requested: bool,
}

impl SurfacePresenter {
    /// Marks the window as closing; observed through [`FrameTarget::should_close`].
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Resizes the surface. A zero-sized (minimized) window keeps the old surface.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let (Some(w), Some(h)) = (NonZeroU32::new(new_size.width), NonZeroU32::new(new_size.height)) else {
            return;
        };
        self.surface.resize(&self.context, w, h);
        self.size = new_size;
        log::debug!("surface resized to {}x{}", new_size.width, new_size.height);
    }
}

impl FrameTarget for SurfacePresenter {
    fn should_close(&self) -> bool {
        self.close_requested
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.size.width, self.size.height)
    }

    fn present(&mut self) -> Result<()> {
        self.surface
            .swap_buffers(&self.context)
            .map_err(|e| RenderError::Present(e.to_string()))
    }
}

/// Window, surface, current GL context and the loaded driver entry points.
///
/// Field order is drop order: the function table and context go before the
/// window they render into.
pub struct GlContext {
    gl: glow::Context,
    presenter: SurfacePresenter,
    window: Window,
}

impl GlContext {
    /// Creates the window and a current core-profile context for it.
    pub fn new(event_loop: &ActiveEventLoop, attrs: WindowAttributes, init: &ContextInit) -> Result<Self> {
        let mut template = ConfigTemplateBuilder::new().with_alpha_size(8);
        if init.min_samples > 0 {
            template = template.with_multisampling(init.min_samples);
        }

        let (window, config) = DisplayBuilder::new()
            .with_window_attributes(Some(attrs))
            .build(event_loop, template, |configs| {
                // The display reports an error before calling us if nothing matches.
                configs
                    .reduce(|best, c| if c.num_samples() > best.num_samples() { c } else { best })
                    .expect("config list is never empty")
            })
            .map_err(|e| init_err("no suitable GL config", e))?;
        let window = window.ok_or_else(|| RenderError::ContextInit("window was not created".into()))?;

        let display = config.display();
        let raw_handle = window
            .window_handle()
            .map_err(|e| init_err("window handle unavailable", e))?
            .as_raw();

        let (major, minor) = init.gl_version;
        let context_attrs = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .build(Some(raw_handle));

        let not_current = unsafe { display.create_context(&config, &context_attrs) }
            .map_err(|e| init_err(&format!("OpenGL {major}.{minor} core context"), e))?;

        let surface_attrs = window
            .build_surface_attributes(Default::default())
            .map_err(|e| init_err("surface attributes", e))?;
        let surface = unsafe { display.create_window_surface(&config, &surface_attrs) }
            .map_err(|e| init_err("window surface", e))?;

        let context = not_current
            .make_current(&surface)
            .map_err(|e| init_err("make current", e))?;

        let interval = if init.vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(e) = surface.set_swap_interval(&context, interval) {
            log::warn!("failed to set swap interval {interval:?}: {e}");
        }

        let gl = unsafe { glow::Context::from_loader_function_cstr(|s| display.get_proc_address(s)) };
        log::info!(
            "OpenGL context ready: {:?} ({} samples)",
            gl.version(),
            config.num_samples()
        );

        let size = window.inner_size();
        Ok(Self {
            gl,
            presenter: SurfacePresenter {
                context,
                surface,
                size,
                close_requested: false,
            },
            window,
        })
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn presenter(&self) -> &SurfacePresenter {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut SurfacePresenter {
        &mut self.presenter
    }

    /// Borrows everything a frame needs at once.
    pub fn split(&mut self) -> (&Window, &glow::Context, &mut SurfacePresenter) {
        (&self.window, &self.gl, &mut self.presenter)
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.presenter.resize(new_size);
    }
}
