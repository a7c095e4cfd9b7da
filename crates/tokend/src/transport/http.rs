// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::credential::manager::TokenManager;

/// `GET /get_token`: the current access token and its timings.
///
/// Refreshes synchronously only when the token has already expired. Failures
/// are logged in full and answered with a generic 500.
pub async fn get_token(
    State(manager): State<Arc<TokenManager>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    match manager.status().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => {
            tracing::warn!(client = %addr, err = %e, "token request failed");
            e.to_http_response().into_response()
        }
    }
}
