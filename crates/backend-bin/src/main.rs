use anyhow::Context;
use clap::Parser;
use permgate::{
    config::{Settings, DEFAULT_CONFIG_FILE},
    create_router,
    router::open_demo_paths,
    AppState,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Permission-gated demo server
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the configured bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(bind) = cli.bind {
        settings.bind_addr = bind;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::from_settings(&settings).context("opening user store")?;
    state.users.update_permissions(open_demo_paths);
    let app = create_router(state.clone());

    let listener = TcpListener::bind(settings.bind_addr).await?;
    info!(
        addr = %settings.bind_addr,
        algorithm = %settings.password_algorithm,
        "listening"
    );

    axum::serve(listener, app).await?;
    state.users.store().close().await;

    Ok(())
}
