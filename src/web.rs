#![cfg(not(tarpaulin_include))]

use classmate::{Config, app};

/// Main entry point for the web application
///
/// Reads the configuration from the environment and serves the site until
/// the process is stopped.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load();
    log::info!(
        "Starting web server on port {} with data in {}",
        config.port,
        config.data_dir.display()
    );
    app::run(config).await
}
