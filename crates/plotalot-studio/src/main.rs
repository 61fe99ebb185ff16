//! Plot-a-Lot studio: opens one window and draws a built-in figure.

mod app;
mod shapes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use winit::dpi::LogicalSize;

use plotalot_engine::assets::AssetResolver;
use plotalot_engine::device::ContextInit;
use plotalot_engine::logging::{init_logging, LoggingConfig};
use plotalot_engine::window::{Runtime, RuntimeConfig};

use app::StudioApp;
use shapes::Shape;

#[derive(Debug, Parser)]
#[command(name = "plotalot-studio", version, about = "Draws a figure with the Plot-a-Lot engine")]
struct Args {
    /// Figure to draw.
    #[arg(long, value_enum, default_value_t = Shape::Triforce)]
    shape: Shape,

    /// Image under `Resource_Files/Textures` for `--shape textured`
    /// (a generated checkerboard when omitted).
    #[arg(long)]
    texture: Option<String>,

    /// Window width in logical pixels.
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Window height in logical pixels.
    #[arg(long, default_value_t = 800)]
    height: u32,

    /// Directory whose `Resource_Files` is searched before the executable's.
    #[arg(long, default_value = env!("CARGO_MANIFEST_DIR"))]
    assets: PathBuf,

    /// Log filter in `env_logger` syntax, e.g. `plotalot_engine=debug`.
    #[arg(long)]
    log: Option<String>,

    /// Present as fast as possible instead of waiting for vblank.
    #[arg(long)]
    no_vsync: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..LoggingConfig::default()
    });

    log::info!("plotalot-studio: {:?} in {}x{}", args.shape, args.width, args.height);

    let config = RuntimeConfig {
        initial_size: LogicalSize::new(f64::from(args.width), f64::from(args.height)),
        ..RuntimeConfig::default()
    };
    let init = ContextInit {
        vsync: !args.no_vsync,
        ..ContextInit::default()
    };

    let app = StudioApp::new(
        args.shape,
        args.texture,
        AssetResolver::shaders().with_working_dir(&args.assets),
        AssetResolver::textures().with_working_dir(&args.assets),
    );

    match Runtime::run(config, init, app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
