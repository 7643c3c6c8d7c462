use std::path::PathBuf;

use trivolve_engine::device::GpuInit;
use trivolve_engine::logging::{init_logging, LoggingConfig};
use trivolve_engine::window::{Runtime, RuntimeConfig};
use trivolve_evo::{EvolutionApp, EvolutionConfig};
use winit::dpi::LogicalSize;

/// Largest side of the window; bigger grids are shown scaled down.
const MAX_WINDOW_SIDE: f64 = 1024.0;

fn main() {
    init_logging(LoggingConfig::default());

    let mut config = EvolutionConfig::default();
    if let Some(path) = std::env::args_os().nth(1) {
        config.reference_path = PathBuf::from(path);
    }

    if let Err(e) = config.validate() {
        log::error!("invalid configuration: {e}");
        std::process::exit(1);
    }

    let (w, h) = config.image_size();
    let scale = (MAX_WINDOW_SIDE / w.max(h) as f64).min(1.0);

    log::info!(
        "evolving toward {}: {} candidates in a {w}x{h} grid, seed {}",
        config.reference_path.display(),
        config.instance_count(),
        config.seed
    );

    let runtime = RuntimeConfig {
        title: format!("trivolve - {}", config.reference_path.display()),
        initial_size: LogicalSize::new(w as f64 * scale, h as f64 * scale),
        resizable: false,
    };

    // The grid image holds raw reference bytes; an sRGB surface would encode them twice.
    let gpu_init = GpuInit {
        prefer_srgb: false,
        ..Default::default()
    };

    if let Err(e) = Runtime::run(runtime, gpu_init, EvolutionApp::new(config)) {
        log::error!("trivolve failed: {e:#}");
        std::process::exit(1);
    }
}
