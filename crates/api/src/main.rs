use anyhow::Context;
use tracing::{info, warn};

use storeledger_infra::{AppConfig, LogFormat};
use storeledger_observability::LogConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    storeledger_observability::init(&LogConfig {
        format: match config.log_format {
            LogFormat::Json => storeledger_observability::LogFormat::Json,
            LogFormat::Pretty => storeledger_observability::LogFormat::Pretty,
        },
        default_level: config.log_level.clone(),
    });

    if config.jwt_secret_is_default {
        warn!("JWT_SECRET not set; using insecure dev default");
    }

    let app = storeledger_api::app::build_app(&config)
        .await
        .context("failed to wire services")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %listener.local_addr()?, storage = ?config.storage, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
