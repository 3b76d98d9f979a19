//! biblio-proxy entry point.
//!
//! Boots the offline cache proxy, brings the configured generation into
//! service and serves page traffic over HTTP. With `mcp_stdio` set, the
//! operator tools are served on stdio as well. Logging goes to stderr to
//! avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use biblio_client::{FetchClient, FetchConfig};
use biblio_core::settings::SettingsOverrides;
use biblio_core::{AppConfig, OfflineProxy, ProxyConfig, SettingsManager, StoreDb};

mod error;
mod handler;
mod http;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.version,
        scope = %config.scope_url,
        listen = %config.listen_addr,
        "Starting biblio-proxy"
    );

    let db = StoreDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from_app(&config))?);
    let proxy = Arc::new(OfflineProxy::new(db.clone(), network, ProxyConfig::from_app(&config)?));

    proxy.restore().await?;
    match proxy.register().await {
        Ok(outcome) => tracing::info!(outcome = ?outcome, "registration complete"),
        Err(e) => tracing::error!(error = %e, "registration failed; previous generation keeps serving"),
    }

    let listener = TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "HTTP front listening");

    let mcp = if config.mcp_stdio {
        let settings = Arc::new(SettingsManager::load(db, &config, SettingsOverrides::default()).await);
        let handler = handler::LibraryServer::new(proxy.clone(), settings);
        let server = serve_server(handler, stdio()).await?;
        tracing::info!("MCP tools on stdio transport");
        Some(tokio::spawn(async move {
            match server.waiting().await {
                Ok(reason) => tracing::info!(reason = ?reason, "MCP session ended"),
                Err(e) => tracing::warn!(error = %e, "MCP session failed"),
            }
        }))
    } else {
        None
    };

    axum::serve(listener, http::router(proxy))
        .with_graceful_shutdown(shutdown_signal(mcp))
        .await?;

    tracing::info!("biblio-proxy stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or when the MCP session ends.
async fn shutdown_signal(mcp: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    match mcp {
        Some(session) => tokio::select! {
            _ = ctrl_c => {}
            _ = session => {}
        },
        None => ctrl_c.await,
    }
}
