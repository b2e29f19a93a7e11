use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use country_client::{GatewayOptions, DEFAULT_BASE_URL};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "selector.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub request_timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout_secs: None,
            user_agent: format!("selector/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Settings {
    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            base_url: self.base_url.clone(),
            timeout: self.request_timeout_secs.map(Duration::from_secs),
            user_agent: Some(self.user_agent.clone()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

/// Defaults, then the config file, then environment overrides.
///
/// A missing file at the default location is not an error; an explicitly
/// requested one is.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    if let Some(file_cfg) = read_file_settings(path, required)? {
        apply_file_settings(&mut settings, file_cfg);
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn read_file_settings(path: &Path, required: bool) -> anyhow::Result<Option<FileSettings>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if required => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
        Err(_) => return Ok(None),
    };
    let file_cfg = parse_file_settings(&raw)
        .with_context(|| format!("invalid config file '{}'", path.display()))?;
    Ok(Some(file_cfg))
}

fn parse_file_settings(raw: &str) -> Result<FileSettings, toml::de::Error> {
    toml::from_str(raw)
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.base_url {
        settings.base_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = Some(v);
    }
    if let Some(v) = file_cfg.user_agent {
        settings.user_agent = v;
    }
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("COUNTRIES_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = lookup("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }

    if let Some(v) = lookup("APP__USER_AGENT") {
        settings.user_agent = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
