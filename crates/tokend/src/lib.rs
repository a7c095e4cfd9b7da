// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tokend: keeps one OAuth access token alive and hands it out over HTTP.

pub mod config;
pub mod credential;
pub mod error;
pub mod monitor;
pub mod test_support;
pub mod transport;

use std::net::SocketAddr;
use std::sync::{Arc, Once};

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::credential::authorize::ConsoleAuth;
use crate::credential::manager::TokenManager;
use crate::credential::refresh::OAuthClient;
use crate::credential::store::TokenStore;
use crate::monitor::spawn_monitor;
use crate::transport::build_router;

/// Install the ring crypto provider for rustls. Safe to call repeatedly.
pub fn install_crypto_provider() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Bootstrap the credential, then run the monitor and HTTP server until
/// SIGINT/SIGTERM.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let client = OAuthClient::new(config.oauth_settings()).context("building OAuth client")?;
    let manager = Arc::new(TokenManager::new(
        TokenStore::new(&config.token_file),
        client.clone(),
        config.refresh_skew(),
    ));

    let credential = manager
        .bootstrap(&ConsoleAuth::new(client))
        .await
        .context("startup authorization failed")?;
    info!(
        path = %config.token_file.display(),
        expires_at = ?credential.expires_at,
        "credential ready"
    );

    let monitor = spawn_monitor(
        Arc::clone(&manager),
        config.check_interval(),
        config.refresh_skew(),
        shutdown.clone(),
    );
    spawn_signal_handler(shutdown.clone());

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    info!("HTTP listening on {addr}");
    let result = serve(listener, manager, shutdown.clone()).await;

    shutdown.cancel();
    monitor.await.ok();
    result
}

/// Serve the token endpoint on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    manager: Arc<TokenManager>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let router = build_router(manager);
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGTERM");
            }
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGINT");
            }
            _ = shutdown.cancelled() => return,
        }
        shutdown.cancel();
    });
}
