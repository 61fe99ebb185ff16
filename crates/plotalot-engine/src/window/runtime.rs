use anyhow::{Context, Result};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::device::{ContextInit, GlContext};

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "Plot-a-Lot".to_string(),
            initial_size: LogicalSize::new(800.0, 800.0),
            resizable: true,
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window with a GL context and drives `app` until it closes.
    ///
    /// Context creation and `App::on_init` failures are returned once the event
    /// loop has shut down.
    pub fn run<A>(config: RuntimeConfig, init: ContextInit, app: A) -> Result<()>
    where
        A: 'static + App,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    init: ContextInit,
    app: A,

    context: Option<GlContext>,
    frame_index: u64,
    exited: bool,
    failure: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, init: ContextInit, app: A) -> Self {
        Self {
            config,
            init,
            app,
            context: None,
            frame_index: 0,
            exited: false,
            failure: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_resizable(self.config.resizable);

        let context = GlContext::new(event_loop, attrs, &self.init).context("failed to create GL context")?;
        let context = self.context.insert(context);

        self.app
            .on_init(context.gl())
            .context("application initialization failed")?;

        context.window().request_redraw();
        Ok(())
    }

    /// Releases app resources while the context is current, then drops the context.
    fn shutdown(&mut self) {
        let Some(context) = self.context.take() else {
            return;
        };
        if !self.exited {
            self.exited = true;
            self.app.on_exit(context.gl());
        }
        drop(context);
        log::info!("GL context destroyed after {} frames", self.frame_index);
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.shutdown();
        event_loop.exit();
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.is_some() || self.exited {
            return;
        }

        if let Err(e) = self.start(event_loop) {
            log::debug!("startup failed, shutting down");
            self.failure = Some(e);
            self.exit(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(context) = &self.context {
            context.window().request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.context.is_none() {
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.exit(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                if let Some(context) = self.context.as_mut() {
                    context.presenter_mut().request_close();
                }
                self.exit(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                if let Some(context) = self.context.as_mut() {
                    context.resize(new_size);
                    context.window().request_redraw();
                }
            }

            WindowEvent::RedrawRequested => {
                let mut control = AppControl::Continue;

                if let Some(context) = self.context.as_mut() {
                    let (window, gl, presenter) = context.split();
                    let mut ctx = FrameCtx {
                        window: WindowCtx { id: window_id, window },
                        gl,
                        target: presenter,
                        frame_index: self.frame_index,
                    };
                    control = self.app.on_frame(&mut ctx);
                    self.frame_index += 1;
                }

                if control == AppControl::Exit {
                    self.exit(event_loop);
                }
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
