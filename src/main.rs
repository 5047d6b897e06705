use mcp_orgm::{EndpointConfig, OrgmMcpServer};
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Values already present in the environment take precedence over .env
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config = EndpointConfig::from_env();
    if !config.is_configured() {
        tracing::error!("Please verify:");
        tracing::error!("  - POSTGREST_URL points at the PostgREST endpoint");
        tracing::error!("  - CF_ACCESS_CLIENT_ID / CF_ACCESS_CLIENT_SECRET are set if the backend is behind Cloudflare Access");
        std::process::exit(1);
    }

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3001".to_string());

    let server = OrgmMcpServer::from_config(config)?;

    tracing::info!("Testing API access...");
    if let Err(e) = server.test_api_access().await {
        tracing::warn!("API access test failed: {}", e);
        tracing::warn!("The server will continue, but requests may fail until the backend is reachable.");
    }

    // Create server configuration and start SSE server
    let config = SseServerConfig {
        bind: bind_addr.parse()?,
        sse_path: "/sse".to_string(),
        post_path: "/message".to_string(),
        ct: tokio_util::sync::CancellationToken::new(),
        sse_keep_alive: None,
    };

    tracing::info!("ORGM MCP Server listening on {}", config.bind);

    // serve_with_config handles binding, axum server setup, and graceful shutdown internally
    let sse_server = SseServer::serve_with_config(config).await?;

    // Every session shares the same configuration and connection pool
    let ct = sse_server.with_service(move || server.clone());

    tracing::info!("ORGM MCP Server started successfully");

    // Wait for Ctrl+C
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    ct.cancel();

    Ok(())
}
