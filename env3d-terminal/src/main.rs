/// env3d terminal demo - rotating cube
///
/// Renders an `Environment3D` as ASCII art.
/// Usage: env3d-terminal [scene.toml]
/// Controls:
///   - W/S or Up/Down: Move the camera closer or further away
///   - A/D or Left/Right: Orbit the camera
///   - L: Toggle lighting
///   - Space: Pause or resume rendering
///   - Q/ESC: Quit
///
/// Log output goes to `env3d-terminal.log` at info level unless `RUST_LOG` says otherwise.
use env3d_core::SceneConfig;
use env3d_terminal::{AppError, TerminalApp};
use std::fs::File;

fn main() -> Result<(), AppError> {
    // The terminal is taken over by the renderer, so logs go to a file
    let log_file = File::create("env3d-terminal.log")?;
    logger(std::env::var("RUST_LOG").ok().as_deref())
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading scene configuration from {path}");
            SceneConfig::load_from_file(&path)?
        }
        None => SceneConfig::default(),
    };

    println!("env3d terminal renderer - starting (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(&config)?;
    app.run()?;

    println!("Thank you for using the env3d terminal renderer!");
    Ok(())
}

/// Info by default; `rust_log` directives override it
fn logger(rust_log: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info);
    if let Some(filters) = rust_log {
        builder.parse_filters(filters);
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn test_rust_log_overrides_default_level() {
        assert_eq!(logger(None).build().filter(), LevelFilter::Info);
        assert_eq!(logger(Some("warn")).build().filter(), LevelFilter::Warn);
        assert_eq!(logger(Some("trace")).build().filter(), LevelFilter::Trace);
    }
}
