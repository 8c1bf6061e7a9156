//! Chalet viewer: loads a textured OBJ model and renders it with the
//! built-in reference quads, fly camera enabled.

use std::io::BufRead;
use std::path::Path;
use std::process::ExitCode;

use vulkan_engine::config::EngineConfig;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match EngineConfig::load_or_default(Path::new("config.toml")) {
        Ok(config) => config,
        Err(e) => {
            log::error!("configuration error: {e}");
            return pause_and_fail(&e.to_string());
        }
    };

    match vulkan_engine::engine::run(&config) {
        Ok(()) => {
            log::info!("clean shutdown");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("fatal: {e}");
            pause_and_fail(&e.to_string())
        }
    }
}

/// Print the failure, hold the console open until the user presses enter,
/// then exit nonzero. Keeps the diagnostic readable when launched outside a
/// terminal session.
fn pause_and_fail(message: &str) -> ExitCode {
    eprintln!("error: {message}");
    eprintln!("press enter to exit");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
    ExitCode::FAILURE
}
