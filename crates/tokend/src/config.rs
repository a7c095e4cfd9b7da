// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::credential::OAuthSettings;

/// OAuth access-token keeper: refreshes before expiry and serves the
/// current token over HTTP.
#[derive(Debug, Clone, Parser)]
#[command(name = "tokend", version, about)]
pub struct Config {
    /// Host address to bind to.
    #[arg(long, env = "TOKEND_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, env = "TOKEND_PORT", default_value = "5001")]
    pub port: u16,

    /// Path of the JSON token file.
    #[arg(long, env = "TOKEND_TOKEN_FILE", default_value = "token_store.json")]
    pub token_file: PathBuf,

    /// OAuth client identifier.
    #[arg(long, env = "SCHWAB_CLIENT_ID")]
    pub client_id: String,

    /// OAuth client secret.
    #[arg(long, env = "SCHWAB_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Redirect URI registered with the provider.
    #[arg(long, env = "REDIRECT_URI")]
    pub redirect_uri: String,

    /// Authorization endpoint for the interactive flow.
    #[arg(
        long,
        env = "SCHWAB_AUTHORIZE_URL",
        default_value = "https://api.schwabapi.com/v1/oauth/authorize"
    )]
    pub authorize_url: String,

    /// Token endpoint for code exchange and refresh.
    #[arg(long, env = "SCHWAB_TOKEN_URL", default_value = "https://api.schwabapi.com/v1/oauth/token")]
    pub token_url: String,

    /// Space-separated scopes to request. Empty to omit.
    #[arg(long, env = "TOKEND_SCOPE", default_value = "read_accounts read_positions")]
    pub scope: String,

    /// Seconds between background expiry checks.
    #[arg(long, env = "TOKEND_CHECK_INTERVAL_SECS", default_value = "30")]
    pub check_interval_secs: u64,

    /// Refresh this many seconds before the access token expires.
    #[arg(long, env = "TOKEND_REFRESH_SKEW_SECS", default_value = "60")]
    pub refresh_skew_secs: u64,

    /// Timeout in seconds for a single token endpoint request.
    #[arg(long, env = "TOKEND_REFRESH_TIMEOUT_SECS", default_value = "10")]
    pub refresh_timeout_secs: u64,

    /// Log format (json or text).
    #[arg(long, env = "TOKEND_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TOKEND_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.client_id.trim().is_empty() {
            anyhow::bail!("--client-id must not be empty");
        }
        if self.client_secret.trim().is_empty() {
            anyhow::bail!("--client-secret must not be empty");
        }

        for (flag, value) in [
            ("--redirect-uri", &self.redirect_uri),
            ("--authorize-url", &self.authorize_url),
            ("--token-url", &self.token_url),
        ] {
            let url = reqwest::Url::parse(value)
                .map_err(|e| anyhow::anyhow!("{flag}: invalid URL {value:?}: {e}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("{flag}: unsupported scheme {:?}", url.scheme());
            }
        }

        if self.check_interval_secs == 0 {
            anyhow::bail!("--check-interval-secs must be greater than zero");
        }
        if self.refresh_timeout_secs == 0 {
            anyhow::bail!("--refresh-timeout-secs must be greater than zero");
        }
        if !matches!(self.log_format.as_str(), "json" | "text") {
            anyhow::bail!("--log-format must be json or text, got {:?}", self.log_format);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn refresh_skew(&self) -> Duration {
        Duration::from_secs(self.refresh_skew_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    /// Provider settings for the OAuth client.
    pub fn oauth_settings(&self) -> OAuthSettings {
        let scope = self.scope.trim();
        OAuthSettings {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            authorize_url: self.authorize_url.clone(),
            token_url: self.token_url.clone(),
            scope: (!scope.is_empty()).then(|| scope.to_owned()),
            request_timeout: self.refresh_timeout(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
