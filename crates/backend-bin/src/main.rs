use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use tokio::net::TcpListener;
use filedrop_lib::{
    AppState,
    config::load_settings,
    routes,
    telemetry::init_tracing,
};

/// Authenticated per-user file storage over HTTP
#[derive(Debug, Parser)]
#[command(name = "filedrop", version, about)]
struct Cli {
    /// Config file (defaults to ./filedrop.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides `bind_addr`
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Data directory, overrides `data_dir`
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        settings.bind_addr = bind;
    }
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }

    init_tracing(&settings)?;

    let state = Arc::new(AppState::open(settings).await?);
    let addr = state.settings.bind_addr;
    let app = routes::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        // keep serving; only an explicit signal stops the server
        std::future::pending::<()>().await;
    }
}
