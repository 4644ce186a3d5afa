use leadpay_backend::{build_app, LeadpayServiceFactory};
use leadpay_common::logging;
use leadpay_config::{load_config, LoggingConfig};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            let _guard = logging::init(&LoggingConfig::default());
            error!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    // Held until exit so buffered file logs are flushed
    let _log_guard = logging::init(&config.logging);

    let factory = Arc::new(LeadpayServiceFactory::new(&config));
    let app = match build_app(config.clone(), factory) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to build application: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    info!("Server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
