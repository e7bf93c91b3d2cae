//! LLM Fan-out Gateway - Rust Backend
//!
//! Serves `POST /get-responses`, fanning each query out to every configured
//! LLM provider, plus `GET /health` and the static frontend.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use llm_fanout::{config::Config, AppState};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug level logging
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Listen port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    // Determine log level based on --debug flag
    let log_level = if args.debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // Initialize logging (File + Stdout)
    let file_appender = tracing_appender::rolling::daily("logs", "llm_fanout.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(env_filter)
        .init();

    tracing::info!("Log level: {}", log_level);

    let mut config = Config::from_env().map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;
    if let Some(port) = args.port {
        config.port = port;
    }

    tracing::info!(
        "Providers: {}",
        config
            .providers
            .iter()
            .map(|p| format!("{} ({})", p.name, p.model))
            .collect::<Vec<_>>()
            .join(", ")
    );
    tracing::info!(
        "Request timeout {}ms, max query length {}, mode {:?}",
        config.request_timeout.as_millis(),
        config.max_query_length,
        config.mode
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::from_config(config)?;

    // Forget idle rate-limit buckets
    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.retain_recent();
        }
    });

    let app = llm_fanout::router(state);

    // Start server
    tracing::info!("Server is running on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server closed. Process terminating...");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C received. Starting graceful shutdown..."),
        _ = terminate => tracing::info!("SIGTERM received. Starting graceful shutdown..."),
    }
}
