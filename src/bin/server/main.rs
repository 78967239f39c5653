use anyhow::{Context, Result};
use clap::Parser;
use object_store_fs::{
    adapters::inbound::http::router::{create_router, AppState},
    app::AppBuilder,
    config,
    settings::StoreSettings,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "object-store-fs-server")]
#[command(about = "On-demand derivative delivery over S3-compatible storage", long_about = None)]
struct Cli {
    /// Server port to listen on
    #[arg(short, long, env = "SERVER_PORT", default_value = "3000")]
    port: u16,

    /// Server host to bind to
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    host: String,

    #[command(flatten)]
    store: StoreSettings,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn init_logging(&self) -> Result<()> {
        let level = match self.log_level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => "info",
        };
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    cli.init_logging()?;

    info!("Starting object store delivery server");
    info!("Storage backend: {:?}", cli.store.backend);

    let wrapper = config::install(cli.store.wrapper_config()?)
        .context("Failed to install wrapper configuration")?;
    let config = cli.store.to_app_config(wrapper)?;

    let app_services = AppBuilder::new()
        .with_config(config)
        .build()
        .context("Failed to build application")?;

    let coordinator = app_services.coordinator;
    let router = create_router(AppState {
        coordinator: coordinator.clone(),
    });

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    let pending = coordinator.pending_uploads();
    if pending > 0 {
        info!(pending, "Waiting for derivative uploads to finish");
    }
    coordinator.wait_for_uploads().await;

    Ok(())
}
