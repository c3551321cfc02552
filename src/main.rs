use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::sync::watch;

pub mod config;
pub mod http_probe;
pub mod metrics;
pub mod server;

use config::load_config;
use http_probe::report;
use server::ExporterServer;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app_config = match load_config() {
        Ok(app_config) => app_config,
        Err(e) => {
            log::error!("Error loading config: {}", report(&e));
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(app_config.listen_address).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind {}: {}", app_config.listen_address, e);
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let server = ExporterServer::new(app_config.config);
    if let Err(e) = server.serve(listener, shutdown_rx).await {
        log::error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
