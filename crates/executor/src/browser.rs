use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),
    #[error("Browser debug endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("Browser agent request failed: {0}")]
    Agent(String),
}

/// What the browser agent reported for one navigate-and-act request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserRun {
    pub completed: bool,
    pub message: String,
}

/// Drives a browser against an approved URL and task. The production
/// implementation talks to an external agent over HTTP; tests substitute
/// scripted drivers.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn run(&self, url: &str, task: &str, context: &str) -> Result<BrowserRun, BrowserError>;
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub binary: String,
    pub debug_port: u16,
    pub profile_dir: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome".to_string(),
            debug_port: 9222,
            profile_dir: "/tmp/chrome-debug-profile".to_string(),
        }
    }
}

/// A browser process launched with remote debugging enabled.
///
/// The session owns the child process. Shut it down explicitly when the
/// run finishes; `kill_on_drop` covers the paths that never get there.
pub struct BrowserSession {
    child: tokio::process::Child,
}

impl BrowserSession {
    pub async fn launch(config: &BrowserConfig) -> Result<Self, BrowserError> {
        tracing::info!(
            "Launching browser with remote debugging on port {}",
            config.debug_port
        );

        let mut child = tokio::process::Command::new(&config.binary)
            .args(Self::debug_args(config.debug_port, &config.profile_dir))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // Give the browser a moment to bring up the debug endpoint.
        tokio::time::sleep(Duration::from_secs(3)).await;

        if let Err(e) = Self::probe(config.debug_port).await {
            let _ = child.kill().await;
            return Err(e);
        }

        Ok(Self { child })
    }

    fn debug_args(port: u16, profile_dir: &str) -> Vec<String> {
        vec![
            format!("--remote-debugging-port={}", port),
            format!("--user-data-dir={}", profile_dir),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-extensions".to_string(),
            "--disable-default-apps".to_string(),
        ]
    }

    async fn probe(port: u16) -> Result<(), BrowserError> {
        let url = format!("http://127.0.0.1:{}/json/version", port);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .map_err(|e| BrowserError::Unreachable(e.to_string()))?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| BrowserError::Unreachable(e.to_string()))?;
        tracing::debug!("Debug endpoint responded with status {}", response.status());
        Ok(())
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::warn!("Error terminating browser process: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_args_cover_remote_debugging() {
        let args = BrowserSession::debug_args(9222, "/tmp/profile");
        assert!(args.contains(&"--remote-debugging-port=9222".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--no-first-run".to_string()));
    }

    #[test]
    fn test_default_config_targets_cdp_port() {
        let config = BrowserConfig::default();
        assert_eq!(config.debug_port, 9222);
        assert!(!config.binary.is_empty());
    }
}
