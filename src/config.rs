use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_LOG_FILTER: &str = "scout=info";

/// Settings from `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub log_filter: Option<String>,
    pub sender_name: Option<String>, // sign-off for outreach emails
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "scout").map(|d| d.config_dir().join("config.toml"))
    }

    /// Load the user config; a missing file means defaults.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Store location: explicit flag (or SCOUT_DB), then config, then the
    /// platform data dir.
    pub fn database_path(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }
        if let Some(path) = &self.database_path {
            return path.clone();
        }
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "scout") {
            proj_dirs.data_dir().join("scout.db")
        } else {
            PathBuf::from("scout.db")
        }
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.database_path.is_none());
        assert_eq!(config.log_filter(), "scout=info");
    }

    #[test]
    fn reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "database_path = \"/tmp/experts.db\"\nlog_filter = \"scout=debug\"\nsender_name = \"Sam\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.database_path(None), PathBuf::from("/tmp/experts.db"));
        assert_eq!(config.log_filter(), "scout=debug");
        assert_eq!(config.sender_name.as_deref(), Some("Sam"));
    }

    #[test]
    fn cli_path_wins() {
        let config = Config {
            database_path: Some(PathBuf::from("/from/config.db")),
            ..Default::default()
        };
        assert_eq!(
            config.database_path(Some(Path::new("/from/flag.db"))),
            PathBuf::from("/from/flag.db")
        );
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "database_path = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("config.toml"));
    }
}
