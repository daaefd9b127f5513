/// Configuration module.
///
/// Handles loading, validating, and providing default configuration values,
/// and resolves where the documentation store lives.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable overriding the store location.
pub const DB_PATH_ENV: &str = "GRIPTAPE_MCP_DB_PATH";

/// File name of the store shipped next to the binary.
pub const BUNDLED_DB_NAME: &str = "griptape.db";

const APP_DIR_NAME: &str = "griptape-docs-mcp";

// ── Default value functions ──────────────────────────────────────────

fn default_limit() -> usize {
    10
}

fn default_node_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    50
}

fn default_max_query_length() -> usize {
    1000
}

fn default_title_similarity() -> f64 {
    0.75
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Explicit store path. Overridden by the environment and the CLI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    #[serde(default)]
    pub search: SearchConfig,
}

/// Bounds and defaults for the query tools.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    /// Default result count for `search_docs` and `get_code_examples`.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Default result count for `search_griptape_nodes`.
    #[serde(default = "default_node_limit")]
    pub default_node_limit: usize,

    /// Largest `limit` a caller may ask for.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Longest accepted query, in characters.
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Minimum normalized Levenshtein similarity for fuzzy title and node
    /// name resolution.
    #[serde(default = "default_title_similarity")]
    pub title_similarity: f64,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_node_limit: default_node_limit(),
            max_limit: default_max_limit(),
            max_query_length: default_max_query_length(),
            title_similarity: default_title_similarity(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file, or defaults when `path` is `None`.
    ///
    /// An explicitly named file that is missing or malformed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("No config file given, using defaults");
            return Ok(Self::default());
        };

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let cfg: Config = serde_json::from_str(&data)
            .with_context(|| format!("invalid JSON in {}", path.display()))?;

        info!("Loaded configuration from {}", path.display());
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let s = &self.search;
        anyhow::ensure!(s.max_limit > 0, "search.max_limit must be positive");
        anyhow::ensure!(
            (1..=s.max_limit).contains(&s.default_limit),
            "search.default_limit must be between 1 and search.max_limit"
        );
        anyhow::ensure!(
            (1..=s.max_limit).contains(&s.default_node_limit),
            "search.default_node_limit must be between 1 and search.max_limit"
        );
        anyhow::ensure!(
            s.max_query_length > 0,
            "search.max_query_length must be positive"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&s.title_similarity),
            "search.title_similarity must be within 0.0..=1.0"
        );
        Ok(())
    }

    /// Resolve the store path: `cli` flag, then the environment (read through
    /// `env`), then `db_path` from the config file, then the bundled default.
    pub fn resolve_db_path<F>(&self, cli: Option<&Path>, env: F) -> Result<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = cli {
            return Ok(path.to_path_buf());
        }

        if let Some(raw) = env(DB_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            let path = PathBuf::from(raw.trim());
            anyhow::ensure!(
                path.extension().and_then(|e| e.to_str()) == Some("db"),
                "{DB_PATH_ENV} must point to a .db file, got: {}",
                path.display()
            );
            return Ok(path);
        }

        if let Some(path) = &self.db_path {
            return Ok(path.clone());
        }

        Ok(bundled_db_path())
    }
}

/// Default store location: `data/griptape.db` next to the executable, or
/// the per-user data directory when that file does not exist.
#[must_use]
pub fn bundled_db_path() -> PathBuf {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("data").join(BUNDLED_DB_NAME)));

    if let Some(path) = beside_exe.as_ref().filter(|p| p.is_file()) {
        return path.clone();
    }

    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(BUNDLED_DB_NAME))
        .filter(|p| p.is_file())
        .or(beside_exe)
        .unwrap_or_else(|| PathBuf::from("data").join(BUNDLED_DB_NAME))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.search.default_node_limit, 20);
        assert_eq!(config.search.max_limit, 50);
        assert_eq!(config.search.max_query_length, 1000);
        assert!(config.db_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"db_path": "./docs.db", "search": {"max_limit": 100}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("./docs.db")));
        assert_eq!(config.search.max_limit, 100);
        // Other fields should have defaults
        assert_eq!(config.search.default_limit, 10);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("missing.json"))).is_err());
        assert!(Config::load(None).is_ok());
    }

    #[test]
    fn test_validate_bad_limits() {
        let mut config = Config::default();
        config.search.default_limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.default_node_limit = 51;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.title_similarity = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_precedence() {
        let config = Config {
            db_path: Some(PathBuf::from("from-config.db")),
            ..Config::default()
        };
        let env = |key: &str| (key == DB_PATH_ENV).then(|| "/srv/env.db".to_string());

        assert_eq!(
            config.resolve_db_path(Some(Path::new("cli.db")), env).unwrap(),
            PathBuf::from("cli.db")
        );
        assert_eq!(
            config.resolve_db_path(None, env).unwrap(),
            PathBuf::from("/srv/env.db")
        );
        assert_eq!(
            config.resolve_db_path(None, no_env).unwrap(),
            PathBuf::from("from-config.db")
        );
    }

    #[test]
    fn test_env_path_must_be_db_file() {
        let config = Config::default();
        let env = |_: &str| Some("/srv/docs.sqlite".to_string());
        assert!(config.resolve_db_path(None, env).is_err());
    }

    #[test]
    fn test_bundled_default_is_griptape_db() {
        let config = Config::default();
        let path = config.resolve_db_path(None, no_env).unwrap();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(BUNDLED_DB_NAME));
    }
}
