// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the token service.

pub mod http;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::credential::manager::TokenManager;

/// Build the axum `Router`. Serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()` so handlers can log
/// the caller's address.
pub fn build_router(manager: Arc<TokenManager>) -> Router {
    Router::new()
        .route("/get_token", get(http::get_token))
        .layer(TraceLayer::new_for_http())
        .with_state(manager)
}
