//! Standalone Stroke Canvas Application (Desktop)
//!
//! This binary runs the canvas as a native desktop application.
//! For WASM/web builds, the entry point is in lib.rs (`start_canvas`).

#[cfg(not(target_arch = "wasm32"))]
mod desktop {
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    use clap::Parser;
    use stroke_canvas::{App, AppWrapper, CanvasConfig, CanvasError};
    use winit::event_loop::{ControlFlow, EventLoop};

    /// GPU stroke canvas
    #[derive(Parser, Debug)]
    #[command(version, about)]
    pub struct Args {
        /// JSON config overlay
        #[arg(long)]
        config: Option<PathBuf>,

        /// Preset to load on startup
        #[arg(long)]
        preset: Option<PathBuf>,

        /// PNG stamp for the stamp brush
        #[arg(long)]
        brush_texture: Option<PathBuf>,

        /// File stem for Ctrl+S (`<stem>.json` and `<stem>.svg`)
        #[arg(long, default_value = "drawing")]
        output: PathBuf,
    }

    pub fn run(args: Args) -> Result<(), CanvasError> {
        let config = match &args.config {
            Some(path) => CanvasConfig::from_json_file(path)?,
            None => CanvasConfig::default(),
        };
        log::info!("Config: {} segments, undo step {}", config.max_segments, config.undo_step);

        let mut app = App::new(config);
        if let Some(path) = &args.preset {
            let text = std::fs::read_to_string(path)?;
            let count = app.import_preset(&text)?;
            log::info!("Loaded {} segments from {}", count, path.display());
        }
        if let Some(path) = &args.brush_texture {
            app.load_brush_texture(&std::fs::read(path)?)?;
        }

        let event_loop = EventLoop::new().map_err(|e| CanvasError::CreateSurface(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let mut app_wrapper = AppWrapper::new(Rc::new(RefCell::new(app))).with_output(args.output);
        event_loop
            .run_app(&mut app_wrapper)
            .map_err(|e| CanvasError::CreateSurface(e.to_string()))?;

        match app_wrapper.take_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use clap::Parser;

    env_logger::init();
    log::info!("🚀 Starting stroke canvas desktop app");

    match desktop::run(desktop::Args::parse()) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
