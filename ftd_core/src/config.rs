use crate::error::{Error, ErrorKind, Result};
use crate::pageable::DEFAULT_PAGE_SIZE;

use std::collections::BTreeMap;
use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

pub const HOSTNAME_ENV: &str = "FTD_HOSTNAME";
pub const USERNAME_ENV: &str = "FTD_USERNAME";
pub const PASSWORD_ENV: &str = "FTD_PASSWORD";

/// How to reach and authenticate against a device.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Device address, with or without scheme. `https://` is assumed.
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// If false, SSL certificates will not be validated
    #[serde(default = "default_validate_certs")]
    pub validate_certs: bool,
    /// Socket level timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// FDM API version segment, e.g. `latest` or `v6`
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Page size used by list operations
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Extra model name to URL mappings, merged over the builtin ones
    #[serde(default)]
    pub models: BTreeMap<String, String>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("validate_certs", &self.validate_certs)
            .field("timeout", &self.timeout)
            .field("api_version", &self.api_version)
            .field("page_size", &self.page_size)
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

fn default_validate_certs() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

fn default_api_version() -> String {
    "latest".to_owned()
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            hostname: String::new(),
            username: String::new(),
            password: String::new(),
            validate_certs: default_validate_certs(),
            timeout: default_timeout(),
            api_version: default_api_version(),
            page_size: default_page_size(),
            models: BTreeMap::new(),
        }
    }
}

impl ConnectionConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(ConnectionConfig::default());
        }
        Ok(serde_norway::from_str(content)?)
    }

    /// Reads `path` if given, then applies environment overrides and validates.
    pub fn load<I>(path: Option<&Path>, envars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = match path {
            Some(path) => {
                trace!("reading config from: {path:?}");
                Self::from_yaml(&read_to_string(path)?)?
            }
            None => ConnectionConfig::default(),
        };
        let config = config.with_env_overrides(envars);
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides<I>(mut self, envars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in envars {
            match key.as_str() {
                HOSTNAME_ENV => self.hostname = value,
                USERNAME_ENV => self.username = value,
                PASSWORD_ENV => self.password = value,
                _ => (),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("hostname", &self.hostname),
            ("username", &self.username),
            ("password", &self.password),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| k)
        .collect();

        if !missing.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "missing connection settings: {} (set them in the config file or through {HOSTNAME_ENV}, {USERNAME_ENV} and {PASSWORD_ENV})",
                    missing.join(", ")
                ),
            ));
        }
        Ok(())
    }
}
