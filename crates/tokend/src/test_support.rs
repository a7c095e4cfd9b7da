// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a scripted OAuth token endpoint and builders.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Form, Router};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::credential::OAuthSettings;

/// A token request as received by [`MockTokenServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub form: HashMap<String, String>,
}

/// Local token endpoint that replays scripted `(status, body)` responses and
/// counts calls. Once the script runs out the last response repeats.
pub struct MockTokenServer {
    addr: SocketAddr,
    calls: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockTokenServer {
    pub async fn start(responses: Vec<(u16, String)>) -> anyhow::Result<Self> {
        Self::start_with_delay(responses, Duration::ZERO).await
    }

    /// Like [`start`](Self::start), but every response is held back by `delay`.
    pub async fn start_with_delay(
        responses: Vec<(u16, String)>,
        delay: Duration,
    ) -> anyhow::Result<Self> {
        let calls = Arc::new(AtomicU32::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(responses);

        let handler_calls = Arc::clone(&calls);
        let handler_requests = Arc::clone(&requests);
        let app = Router::new().route(
            "/token",
            post(move |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| {
                let calls = Arc::clone(&handler_calls);
                let requests = Arc::clone(&handler_requests);
                let resps = Arc::clone(&responses);
                async move {
                    let idx = calls.fetch_add(1, Ordering::SeqCst) as usize;
                    let authorization = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    requests.lock().await.push(RecordedRequest { authorization, form });

                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let (status, body) = resps
                        .get(idx)
                        .or_else(|| resps.last())
                        .cloned()
                        .unwrap_or((500, "{}".to_owned()));
                    (
                        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                        [("content-type", "application/json")],
                        body,
                    )
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self { addr, calls, requests })
    }

    pub fn token_url(&self) -> String {
        format!("http://{}/token", self.addr)
    }

    /// Number of token requests received so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    /// Settings pointing at this server with test client credentials.
    pub fn settings(&self) -> OAuthSettings {
        test_settings(&self.token_url())
    }
}

/// OAuth settings for tests; nothing listens on the authorize URL.
pub fn test_settings(token_url: &str) -> OAuthSettings {
    OAuthSettings {
        client_id: "test-client".to_owned(),
        client_secret: "test-secret".to_owned(),
        redirect_uri: "https://127.0.0.1/callback".to_owned(),
        authorize_url: "https://auth.invalid/oauth/authorize".to_owned(),
        token_url: token_url.to_owned(),
        scope: None,
        request_timeout: Duration::from_secs(5),
    }
}

/// A successful token endpoint body.
pub fn token_body(access_token: &str, refresh_token: Option<&str>, expires_in: u64) -> String {
    let mut body = serde_json::json!({
        "access_token": access_token,
        "expires_in": expires_in,
        "token_type": "Bearer",
        "scope": "api",
    });
    if let Some(rt) = refresh_token {
        body["refresh_token"] = serde_json::Value::String(rt.to_owned());
    }
    body.to_string()
}

/// An OAuth error body.
pub fn error_body(error: &str, description: &str) -> String {
    serde_json::json!({ "error": error, "error_description": description }).to_string()
}

/// Assert that `$expr` is an `Err` whose message contains `$substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        match $expr {
            Ok(_) => panic!(concat!("expected Err for: ", stringify!($expr))),
            Err(err) => {
                let msg = err.to_string();
                assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
            }
        }
    }};
}
