/// Example: Load and render an STL file in the terminal
///
/// Usage: cargo run --example load_stl -- path/to/file.stl
use env3d_core::{Mesh, SceneConfig};
use env3d_terminal::{AppError, TerminalApp};
use std::env;

fn main() -> Result<(), AppError> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = SceneConfig {
        lighting_enabled: true,
        ambient_light: Some(env3d_core::Color::rgb(40, 40, 40)),
        ..SceneConfig::default()
    };

    let mut app = match args.get(1) {
        Some(stl_path) => {
            println!("Loading STL file: {stl_path}");
            let mesh = Mesh::from_file(stl_path)?;
            println!("Loaded {} triangles", mesh.triangles().len());
            TerminalApp::with_mesh(&config, &mesh)?
        }
        None => {
            eprintln!("Usage: {} <stl-file>", args[0]);
            eprintln!("\nNo STL file provided, using a generated cylinder...");
            let cylinder = Mesh::create_cylinder(0.6, 0.3, 1.5, 16, 2)?;
            TerminalApp::with_mesh(&config, &cylinder)?
        }
    };

    println!("Starting terminal renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));
    app.run()?;

    println!("Thank you for using the env3d terminal renderer!");
    Ok(())
}
