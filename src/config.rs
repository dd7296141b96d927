use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::error::IndexError;

pub const ENV_API_KEY: &str = "TYPESENSE_API_KEY";
pub const ENV_SEARCH_API_KEY: &str = "TYPESENSE_SEARCH_API_KEY";

/// Everything the pipeline needs for one run, resolved from CLI flags with
/// environment fallback for the API keys.
#[derive(Debug, Clone)]
pub struct Config {
    pub out_dir: PathBuf,
    pub theme: Option<String>,
    pub content_selectors: Vec<String>,
    pub collection: String,
    pub doc_version: String,
    pub language: String,
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub api_key: String,
    pub search_api_key: String,
    pub drop_existing: bool,
    pub indexing_enabled: bool,
    pub timeout_secs: u64,
}

impl Config {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Fill empty API keys from the environment.
    pub fn resolve_env(&mut self) {
        if self.api_key.is_empty() {
            if let Ok(key) = env::var(ENV_API_KEY) {
                self.api_key = key;
            }
        }
        if self.search_api_key.is_empty() {
            if let Ok(key) = env::var(ENV_SEARCH_API_KEY) {
                self.search_api_key = key;
            }
        }
    }

    /// Reject broken configuration before any file or network I/O happens.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(IndexError::Config(format!(
                "invalid protocol '{}', must be http or https",
                self.protocol
            )));
        }
        if self.host.is_empty() {
            return Err(IndexError::Config("host must not be empty".into()));
        }
        if self.collection.is_empty() {
            return Err(IndexError::Config("collection name must not be empty".into()));
        }
        if self.indexing_enabled && self.api_key.is_empty() {
            return Err(IndexError::Config(format!(
                "admin API key missing (pass --api-key or set {})",
                ENV_API_KEY
            )));
        }
        if !self.api_key.is_empty() && self.api_key == self.search_api_key {
            warn!(
                "Admin and search API keys are identical; use a search-only key in production"
            );
        }
        Ok(())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            out_dir: PathBuf::from("_build/html"),
            theme: None,
            content_selectors: Vec::new(),
            collection: "docs".into(),
            doc_version: String::new(),
            language: "en".into(),
            host: "localhost".into(),
            port: 8108,
            protocol: "http".into(),
            api_key: "admin-key".into(),
            search_api_key: "search-key".into(),
            drop_existing: false,
            indexing_enabled: true,
            timeout_secs: 10,
        }
    }

    #[test]
    fn valid_config_passes() {
        base().validate().unwrap();
    }

    #[test]
    fn invalid_protocol_is_rejected() {
        let mut config = base();
        config.protocol = "ftp".into();
        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), "configuration");
        assert!(err.to_string().contains("protocol"));
    }

    #[test]
    fn missing_admin_key_is_fatal_only_when_indexing() {
        let mut config = base();
        config.api_key = String::new();
        assert!(config.validate().is_err());

        config.indexing_enabled = false;
        config.validate().unwrap();
    }

    #[test]
    fn empty_collection_is_rejected() {
        let mut config = base();
        config.collection = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn base_url_joins_protocol_host_and_port() {
        assert_eq!(base().base_url(), "http://localhost:8108");
    }

    #[test]
    fn env_fallback_fills_only_empty_keys() {
        let mut config = base();
        config.api_key = String::new();
        env::set_var(ENV_API_KEY, "from-env");
        config.resolve_env();
        env::remove_var(ENV_API_KEY);

        assert_eq!(config.api_key, "from-env");
        // An explicitly set key is never overridden.
        assert_eq!(config.search_api_key, "search-key");
    }
}
