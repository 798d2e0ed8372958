use crate::RuntimeError;
use dreamlock_schema::write_atomic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TRANSLATOR_TIMEOUT_SECS: u64 = 600;
const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 1800;

/// User configuration for the packaging backends.
///
/// Loaded once by the binary and passed down explicitly; nothing below the
/// binary reads the process environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: String,
    /// Checkout of the packaging framework the nix expressions are imported from.
    pub framework_src: PathBuf,
    /// Scheme prefixes recognized as fetcher shortcuts (`github`, `git`, ...).
    pub fetcher_names: Vec<String>,
    pub translator_timeout_secs: u64,
    pub oracle_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: "nix".to_owned(),
            framework_src: PathBuf::from("."),
            fetcher_names: Vec::new(),
            translator_timeout_secs: DEFAULT_TRANSLATOR_TIMEOUT_SECS,
            oracle_timeout_secs: DEFAULT_ORACLE_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, RuntimeError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| RuntimeError::Config(format!("invalid config {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), RuntimeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::Config(format!("cannot serialize config: {e}")))?;
        write_atomic(path, content.as_bytes())?;
        Ok(())
    }

    /// `~/.config/dreamlock/config.toml` under the given home directory.
    pub fn default_path(home: &Path) -> PathBuf {
        home.join(".config/dreamlock/config.toml")
    }

    /// Replace the shortcut prefixes with a whitespace-separated list.
    #[must_use]
    pub fn with_fetcher_names(mut self, names: &str) -> Self {
        self.fetcher_names = names.split_whitespace().map(str::to_owned).collect();
        self
    }

    pub fn translator_timeout(&self) -> Duration {
        Duration::from_secs(self.translator_timeout_secs)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = Config::default_path(dir.path());

        let config = Config {
            backend: "mock".to_owned(),
            framework_src: PathBuf::from("/opt/framework"),
            fetcher_names: vec!["github".to_owned(), "git".to_owned()],
            translator_timeout_secs: 5,
            oracle_timeout_secs: 9,
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.oracle_timeout(), Duration::from_secs(9));
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = \"nix\"\n").unwrap();

        let config = Config {
            backend: "mock".to_owned(),
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap().backend, "mock");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n != "config.toml")
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "fetcher_names = [\"github\"]\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.fetcher_names, vec!["github"]);
        assert_eq!(config.backend, "nix");
        assert_eq!(config.translator_timeout_secs, 600);
    }

    #[test]
    fn unknown_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bogus = 1\n").unwrap();
        assert!(matches!(Config::load(&path), Err(RuntimeError::Config(_))));
    }

    #[test]
    fn fetcher_names_from_whitespace_list() {
        let config = Config::default().with_fetcher_names("github  gitlab\tgit");
        assert_eq!(config.fetcher_names, vec!["github", "gitlab", "git"]);
    }
}
