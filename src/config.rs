use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration for the rostersync reconciliation core
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minutes added to UTC for the displayed wall-clock times
    pub display_offset_minutes: i32,
    /// How long a fetched month stays live in the request cache
    pub cache_ttl_ms: u64,
    /// Namespace for the durable overlay snapshot (e.g. the remote
    /// tracker's base URL)
    pub namespace: String,
    /// Override for the snapshot directory; platform data dir when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_offset_minutes: 0,
            cache_ttl_ms: 60_000,
            namespace: "default".into(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load config from .rostersync.toml, searching up from the given directory
    pub fn load(start_dir: &Path) -> Result<Self> {
        if let Some(path) = find_config_file(start_dir) {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

/// Search for .rostersync.toml from start_dir upward
fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let candidate = dir.join(".rostersync.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.display_offset_minutes, 0);
        assert_eq!(config.cache_ttl_ms, 60_000);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
display_offset_minutes = 180
cache_ttl_ms = 30000
namespace = "https://tracker.example.com"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.display_offset_minutes, 180);
        assert_eq!(config.cache_ttl_ms, 30_000);
        assert_eq!(config.namespace, "https://tracker.example.com");
    }

    #[test]
    fn test_load_searches_upward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".rostersync.toml"),
            "display_offset_minutes = -300\n",
        )
        .unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::load(&nested).unwrap();
        assert_eq!(config.display_offset_minutes, -300);
    }
}
