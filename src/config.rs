//! Environment-driven configuration, read once at process start.
//! Every knob has a development-friendly default so `tabularium` starts with no
//! environment at all; production deployments set the TABULARIUM_* variables.

use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    /// Postgres connection string for the canonical record store.
    pub database_url: String,
    /// Base URL of the Elasticsearch-compatible search engine.
    pub search_url: String,
    /// Index holding the denormalized entity projection.
    pub search_index: String,
    /// Root directory the disk file handler resolves content paths under.
    pub content_root: PathBuf,
    /// Public base URL used when building API links into responses.
    pub base_url: String,
    /// Header instructing the front-end proxy to serve a file itself.
    pub accel_header: String,
    /// Internal location prefix for offloaded transfers; offload is disabled when unset.
    pub accel_prefix: Option<String>,
    /// License URIs whose records are publicly accessible.
    pub public_licenses: Vec<String>,
    /// Where gated clients are sent to request content authorization.
    pub authorization_url: Option<String>,
    /// Access policy selector: "license" or "open".
    pub access_policy: String,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            http_port: var_or("TABULARIUM_HTTP_PORT", "7878").parse().unwrap_or(7878),
            database_url: var_or(
                "TABULARIUM_DATABASE_URL",
                "postgres://localhost/tabularium",
            ),
            search_url: var_or("TABULARIUM_SEARCH_URL", "http://localhost:9200"),
            search_index: var_or("TABULARIUM_SEARCH_INDEX", "entities"),
            content_root: PathBuf::from(var_or("TABULARIUM_CONTENT_ROOT", "content")),
            base_url: var_or("TABULARIUM_BASE_URL", "http://localhost:7878"),
            accel_header: var_or("TABULARIUM_ACCEL_HEADER", "X-Accel-Redirect"),
            accel_prefix: var_opt("TABULARIUM_ACCEL_PREFIX"),
            public_licenses: var_or("TABULARIUM_PUBLIC_LICENSES", "")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            authorization_url: var_opt("TABULARIUM_AUTHORIZATION_URL"),
            access_policy: var_or("TABULARIUM_ACCESS_POLICY", "license"),
        }
    }

    /// Log the effective configuration at startup so a misconfigured deploy is
    /// visible in the first lines of output.
    pub fn log_startup(&self) {
        info!(
            target: "startup",
            "tabularium starting: http_port={}, database_url={:?}, search_url={:?}, search_index={:?}, content_root={:?}, base_url={:?}, accel_prefix={:?}, access_policy={:?}",
            self.http_port, self.database_url, self.search_url, self.search_index,
            self.content_root, self.base_url, self.accel_prefix, self.access_policy
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        // Same defaults as an empty environment; used by tests.
        Config {
            http_port: 7878,
            database_url: "postgres://localhost/tabularium".to_string(),
            search_url: "http://localhost:9200".to_string(),
            search_index: "entities".to_string(),
            content_root: PathBuf::from("content"),
            base_url: "http://localhost:7878".to_string(),
            accel_header: "X-Accel-Redirect".to_string(),
            accel_prefix: None,
            public_licenses: Vec::new(),
            authorization_url: None,
            access_policy: "license".to_string(),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
