use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// App configuration loaded from `deskpilot.toml` (or `--config`), with
/// `DESKPILOT_*` environment variables taking precedence over the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub script: ScriptConfig,
    pub browser: BrowserSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key. Leave the
    /// variable unset for endpoints that take anonymous requests.
    pub api_key_env: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-2024-08-06".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub interpreter: String,
    pub inline_flag: String,
    pub timeout_secs: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: "osascript".to_string(),
            inline_flag: "-e".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub agent_endpoint: String,
    /// Launch a local Chrome with remote debugging for browser steps. Turn
    /// off when the sidecar manages its own browser.
    pub launch_chrome: bool,
    pub chrome_path: String,
    pub debug_port: u16,
    pub profile_dir: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            agent_endpoint: "http://localhost:3000".to_string(),
            launch_chrome: true,
            chrome_path: "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
                .to_string(),
            debug_port: 9222,
            profile_dir: "/tmp/chrome-debug-profile".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("DESKPILOT_ENDPOINT") {
            self.service.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("DESKPILOT_MODEL") {
            self.service.model = model;
        }
        if let Ok(agent) = std::env::var("DESKPILOT_BROWSER_AGENT") {
            self.browser.agent_endpoint = agent;
        }
    }

    /// `DESKPILOT_API_KEY` wins over the variable named by `api_key_env`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var("DESKPILOT_API_KEY")
            .or_else(|_| std::env::var(&self.service.api_key_env))
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.endpoint.trim().is_empty() {
            anyhow::bail!("service.endpoint cannot be empty");
        }
        if self.service.model.trim().is_empty() {
            anyhow::bail!("service.model cannot be empty");
        }
        if self.script.interpreter.trim().is_empty() {
            anyhow::bail!("script.interpreter cannot be empty");
        }
        if self.script.timeout_secs == 0 {
            anyhow::bail!("script.timeout_secs must be greater than zero");
        }
        if self.browser.agent_endpoint.trim().is_empty() {
            anyhow::bail!("browser.agent_endpoint cannot be empty");
        }
        Ok(())
    }
}
