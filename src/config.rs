//! Store configuration.
//!
//! [`StoreConfig`] is loaded from `config/config.toml` or environment
//! variables using `StoreConfig::load()`. The store is addressed by a URI of
//! the form `scheme:///table[/index]?prefix=<hash attr>&suffix=<sort attr>`,
//! e.g. `ddb:///people/by-org?prefix=org&suffix=id` or `s3:///my-bucket`.

use crate::error::{Error, Result};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Default attribute holding the hash key
pub const DEFAULT_HASH_ATTRIBUTE: &str = "prefix";
/// Default attribute holding the sort key
pub const DEFAULT_SORT_ATTRIBUTE: &str = "suffix";

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_uri() -> String {
    "ddb:///keyval".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            page_size: default_page_size(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Parsed store URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    pub table: String,
    pub index: Option<String>,
    pub hash_attribute: String,
    pub sort_attribute: String,
}

impl StoreConfig {
    /// Load the store configuration from `config/config.toml`, falling back to env vars.
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config/config.toml").required(false))
            .add_source(Environment::with_prefix("KEYVAL").separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // An unreadable file must not hide a valid environment
                if std::path::Path::new("config/config.toml").exists() {
                    log::warn!("failed to load config file, falling back to env: {}", err);
                }
                Config::builder()
                    .add_source(Environment::with_prefix("KEYVAL").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        let store: StoreConfig = match settings.get::<StoreConfig>("store") {
            Ok(store) => store,
            Err(ConfigError::NotFound(_)) => StoreConfig::default(),
            Err(e) => {
                return Err(ConfigError::Message(format!(
                    "Store configuration could not be loaded from file or environment: {}",
                    e
                )))
            }
        };

        Ok(store)
    }

    /// Parse [`StoreConfig::uri`]
    pub fn endpoint(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.uri)
    }
}

impl Endpoint {
    pub fn parse(uri: &str) -> Result<Self> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| Error::Config(format!("store uri has no scheme: {uri}")))?;
        if scheme.is_empty() {
            return Err(Error::Config(format!("store uri has no scheme: {uri}")));
        }

        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        // authority is ignored: `ddb:///table` and `ddb://table` both name `table`
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let table = segments
            .next()
            .ok_or_else(|| Error::Config(format!("store uri has no table: {uri}")))?
            .to_string();
        let index = segments.next().map(str::to_string);

        let mut hash_attribute = DEFAULT_HASH_ATTRIBUTE.to_string();
        let mut sort_attribute = DEFAULT_SORT_ATTRIBUTE.to_string();
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            match pair.split_once('=') {
                Some(("prefix", v)) if !v.is_empty() => hash_attribute = v.to_string(),
                Some(("suffix", v)) if !v.is_empty() => sort_attribute = v.to_string(),
                _ => {}
            }
        }

        Ok(Self {
            scheme: scheme.to_string(),
            table,
            index,
            hash_attribute,
            sort_attribute,
        })
    }
}
