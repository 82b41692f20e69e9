//! HTTP server for the question-to-SQL bridge

use sql_bridge::config::BridgeConfig;
use sql_bridge::service::BridgeService;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BridgeConfig::from_env()?;
    sql_bridge::logging::init()?;

    info!(
        port = config.port,
        db_host = %config.database.host,
        db_name = %config.database.name,
        model = %config.llm.model,
        "server.starting"
    );

    let service = Arc::new(BridgeService::connect(&config).await?);
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    sql_bridge::server::serve(listener, service).await?;

    Ok(())
}
