// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Smoke tests that spawn the real `tokend` binary.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokend::credential::{epoch_secs, persist, Credential};

/// Find a free TCP port by binding to :0 then releasing.
fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

struct TokendProcess {
    child: Child,
    port: u16,
}

impl TokendProcess {
    fn spawn(dir: &Path, token_url: &str) -> anyhow::Result<Self> {
        let port = free_port()?;
        let child = Command::new(env!("CARGO_BIN_EXE_tokend"))
            .current_dir(dir)
            .env_clear()
            .args(["--port", &port.to_string()])
            .args(["--token-file", "token_store.json"])
            .args(["--client-id", "smoke-client", "--client-secret", "smoke-secret"])
            .args(["--redirect-uri", "https://127.0.0.1/callback"])
            .args(["--token-url", token_url])
            .args(["--log-level", "debug"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(Self { child, port })
    }

    fn url(&self) -> String {
        format!("http://127.0.0.1:{}/get_token", self.port)
    }

    async fn wait_ready(&self, timeout: Duration) -> anyhow::Result<reqwest::Response> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match reqwest::get(self.url()).await {
                Ok(resp) => return Ok(resp),
                Err(e) if tokio::time::Instant::now() >= deadline => {
                    anyhow::bail!("tokend not ready after {timeout:?}: {e}")
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    }

    async fn wait_exit(&mut self, timeout: Duration) -> anyhow::Result<std::process::ExitStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            anyhow::ensure!(tokio::time::Instant::now() < deadline, "tokend did not exit");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for TokendProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[tokio::test]
async fn serves_stored_token_and_stops_on_sigterm() -> anyhow::Result<()> {
    tokend::install_crypto_provider();
    let dir = tempfile::tempdir()?;
    let credential = Credential {
        refresh_token: Some("rt".into()),
        expires_in: Some(1800),
        expires_at: Some(epoch_secs() + 1800.0),
        ..Credential::new("smoke-access")
    };
    persist::write(&dir.path().join("token_store.json"), &credential)?;

    // Nothing listens here; a valid token never needs it.
    let mut tokend = TokendProcess::spawn(dir.path(), "http://127.0.0.1:9/token")?;
    let resp = tokend.wait_ready(Duration::from_secs(10)).await?;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["access_token"], "smoke-access");

    let status = Command::new("kill").args(["-TERM", &tokend.child.id().to_string()]).status()?;
    assert!(status.success());
    let exit = tokend.wait_exit(Duration::from_secs(5)).await?;
    assert!(exit.success(), "exit status {exit:?}");
    Ok(())
}

#[tokio::test]
async fn invalid_config_exits_with_status_2() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = Command::new(env!("CARGO_BIN_EXE_tokend"))
        .current_dir(dir.path())
        .env_clear()
        .args(["--client-id", "c", "--client-secret", "s"])
        .args(["--redirect-uri", "https://127.0.0.1/callback"])
        .args(["--check-interval-secs", "0"])
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--check-interval-secs"));
    Ok(())
}
