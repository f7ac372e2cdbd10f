//! horcrux-vault - hosts one shard holder
//!
//! usage:
//!   HORCRUX_SERVER_CONFIG=v1.horcrux-server... horcrux-vault --port 3001
//!   horcrux-vault --config v1.horcrux-server... --port 3001
//!
//! the token comes from `horcrux split`. it is decoded once at startup and
//! never written anywhere.

mod routes;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use horcrux::{decode_state_env, Audience, Handler, PrivateState};
use metrics::gauge;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::routes::{router, AppState};

/// horcrux-vault - guard one shard of a master secret
#[derive(Parser)]
#[command(name = "horcrux-vault")]
#[command(about = "horcrux vault - guard one shard of a master secret")]
#[command(version)]
struct Args {
    /// server provisioning token
    #[arg(long, env = "HORCRUX_SERVER_CONFIG", hide_env_values = true)]
    config: String,

    /// port to listen on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// metrics port (prometheus endpoint, default: api_port + 1000)
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "horcrux_vault=info,horcrux=info".into()),
        )
        .init();

    let args = Args::parse();

    let state: PrivateState =
        decode_state_env(&args.config, Audience::Server).context("invalid server token")?;

    let metrics_port = args
        .metrics_port
        .unwrap_or_else(|| args.port.saturating_add(1000));
    let metrics_addr: std::net::SocketAddr = format!("{}:{}", args.bind, metrics_port)
        .parse()
        .context("invalid metrics address")?;

    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .context("failed to install prometheus metrics exporter")?;

    info!("horcrux-vault v{}", env!("CARGO_PKG_VERSION"));
    info!("  name: {}", state.name());
    info!("  identifier: {}", state.public().identifier);
    info!("  bind: {}:{}", args.bind, args.port);
    info!("  metrics: {}:{}", args.bind, metrics_port);

    gauge!("vault_up").set(1.0);

    let app = router(Arc::new(AppState {
        handler: Handler::new(state),
    }));

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
