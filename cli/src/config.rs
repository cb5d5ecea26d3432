//! CLI Configuration

use anyhow::{anyhow, Context};
use assetmeta::ClientConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    pub base_url: Option<String>,
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

/// Values given on the command line or in the environment; they win over the file
#[derive(Debug, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl Config {
    pub fn load(profile: Option<&str>) -> anyhow::Result<Self> {
        let path = Self::config_path(profile)?;
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, profile: Option<&str>) -> anyhow::Result<PathBuf> {
        let path = Self::config_path(profile)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    pub fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        match key {
            "base_url" => self.base_url = Some(value),
            "cloud_name" => self.cloud_name = Some(value),
            "api_key" => self.api_key = Some(value),
            "api_secret" => self.api_secret = Some(value),
            _ => return Err(anyhow!("Unknown config key: {}", key)),
        }
        Ok(())
    }

    /// Value for display; secrets are masked
    pub fn display(&self, key: &str) -> anyhow::Result<String> {
        let value = match key {
            "base_url" => self.base_url.clone(),
            "cloud_name" => self.cloud_name.clone(),
            "api_key" => self.api_key.as_deref().map(mask),
            "api_secret" => self.api_secret.as_deref().map(mask),
            _ => return Err(anyhow!("Unknown config key: {}", key)),
        };
        Ok(value.unwrap_or_else(|| "(not set)".into()))
    }

    pub fn client_config(self, overrides: Overrides) -> anyhow::Result<ClientConfig> {
        let cloud_name = overrides
            .cloud_name
            .or(self.cloud_name)
            .context("cloud name is not configured (use --cloud-name or `assetmeta config set cloud_name`)")?;
        let api_key = overrides
            .api_key
            .or(self.api_key)
            .context("API key is not configured")?;
        let api_secret = overrides
            .api_secret
            .or(self.api_secret)
            .context("API secret is not configured")?;

        let mut config = ClientConfig::new(cloud_name, api_key, api_secret);
        if let Some(base_url) = overrides.base_url.or(self.base_url) {
            config = config.base_url(base_url);
        }
        Ok(config)
    }

    fn config_path(profile: Option<&str>) -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir().context("Cannot find home directory")?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home.join(".assetmeta").join(filename))
    }
}

fn mask(secret: &str) -> String {
    let shown: String = secret.chars().take(4).collect();
    format!("{}****", shown)
}
