// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    missing_code = { TokenError::MissingAuthorizationCode, false },
    exchange = { TokenError::CodeExchangeFailed("bad code".into()), false },
    no_refresh = { TokenError::NoRefreshToken, true },
    not_authorized = { TokenError::NotAuthorized, true },
    transient = { TokenError::RefreshFailed { cause: "connection reset".into(), rejected: false }, false },
    rejected = { TokenError::RefreshFailed { cause: "invalid_grant".into(), rejected: true }, true },
    storage = { TokenError::Storage("disk full".into()), false },
)]
fn requires_reauth(err: TokenError, expected: bool) {
    assert_eq!(err.requires_reauth(), expected);
}

#[test]
fn http_response_hides_cause() {
    let err = TokenError::RefreshFailed {
        cause: "HTTP 502: upstream secret detail".into(),
        rejected: false,
    };
    let (status, body) = err.to_http_response();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.error, "failed to obtain access token");
    assert!(!body.error.contains("secret"));
}

#[test]
fn not_authorized_tells_operator_what_to_do() {
    let (status, body) = TokenError::NotAuthorized.to_http_response();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.error, "initial authorization required");
}

#[test]
fn display_includes_cause() {
    let err = TokenError::Storage("permission denied".into());
    assert_eq!(err.to_string(), "token storage error: permission denied");

    let err = TokenError::RefreshFailed { cause: "expired".into(), rejected: true };
    assert_eq!(err.to_string(), "refresh token rejected: expired");
}
