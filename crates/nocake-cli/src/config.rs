//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nocake_affilinet::{AffilinetConfig, ImportConfig};
use nocake_search::HttpEngine;
use serde::Deserialize;

/// Global configuration for nocake
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub affilinet: AffilinetSection,
    pub search: SearchSection,
    pub http: HttpSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AffilinetSection {
    pub partner_id: u32,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_password: Option<String>,
    pub catalog_url: String,
    pub feed_base_url: String,
    pub download_dir: PathBuf,
    pub ignore_lists: Vec<u32>,
}

impl Default for AffilinetSection {
    fn default() -> Self {
        let defaults = AffilinetConfig::default();
        Self {
            partner_id: 493114,
            api_password: std::env::var("AFFILINET_API_PASSWORD").ok(),
            catalog_url: defaults.catalog_url,
            feed_base_url: defaults.feed_base_url,
            download_dir: defaults.download_dir,
            ignore_lists: ImportConfig::default().ignore_lists,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub url: String,
    pub alias: String,
    pub username: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub password: Option<String>,
    pub batch_size: usize,
    pub analyzer: String,
}

impl Default for SearchSection {
    fn default() -> Self {
        let defaults = ImportConfig::default();
        Self {
            url: "http://localhost:9200".to_string(),
            alias: defaults.alias,
            username: None,
            password: std::env::var("NOCAKE_SEARCH_PASSWORD").ok(),
            batch_size: defaults.batch_size,
            analyzer: defaults.analyzer,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Connect timeout in seconds
    pub connect_timeout: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            connect_timeout: 30,
        }
    }
}

/// Secret that may reference environment variables, e.g. `"${AFFILINET_PW}"`
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| expand_env_var(&value)))
}

/// Replace every `${VAR}` in `s` with the variable's value.
///
/// `None` if a referenced variable is unset; text without references is
/// returned unchanged, as is an unterminated `${`.
fn expand_env_var(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&std::env::var(&rest[start + 2..start + 2 + len]).ok()?);
        rest = &rest[start + 3 + len..];
    }
    out.push_str(rest);
    Some(out)
}

impl Config {
    /// First existing of `./nocake.toml` and the user config dir's
    /// `config.toml`; defaults when neither exists.
    pub fn load() -> Result<Self> {
        let user_config = directories::ProjectDirs::from("", "", "nocake")
            .map(|dirs| dirs.config_dir().join("config.toml"));

        let found = std::iter::once(PathBuf::from("nocake.toml"))
            .chain(user_config)
            .find(|path| path.exists());

        match found {
            Some(path) => Self::from_file(&path),
            None => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn affilinet_config(&self) -> AffilinetConfig {
        AffilinetConfig {
            partner_id: self.affilinet.partner_id,
            api_password: self.affilinet.api_password.clone().unwrap_or_default(),
            catalog_url: self.affilinet.catalog_url.clone(),
            feed_base_url: self.affilinet.feed_base_url.clone(),
            download_dir: self.affilinet.download_dir.clone(),
        }
    }

    pub fn import_config(&self) -> ImportConfig {
        ImportConfig {
            alias: self.search.alias.clone(),
            batch_size: self.search.batch_size,
            ignore_lists: self.affilinet.ignore_lists.clone(),
            analyzer: self.search.analyzer.clone(),
            ..Default::default()
        }
    }

    pub fn search_engine(&self) -> HttpEngine {
        let engine = HttpEngine::new(&self.search.url);
        match &self.search.username {
            Some(user) => engine.with_basic_auth(user.clone(), self.search.password.clone()),
            None => engine,
        }
    }
}
