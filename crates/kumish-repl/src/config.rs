//! REPL configuration from `$XDG_CONFIG_HOME/kumish/config.toml`.
//!
//! ```toml
//! prompt = "kumish$ "
//! history_size = 5000
//! history_file = "/home/me/.kumish_history"
//! hup_on_exit = true
//! notify = true
//! ```
//!
//! Every key is optional. A missing file means all defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;

/// Settings for the interactive front end.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplConfig {
    /// Prompt printed before each line.
    pub prompt: String,
    /// History location. Defaults to the data dir.
    pub history_file: Option<PathBuf>,
    /// Entries kept in history.
    pub history_size: usize,
    /// SIGHUP jobs not marked nohup when the shell exits.
    pub hup_on_exit: bool,
    /// Report job status changes before each prompt.
    pub notify: bool,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: "kumish$ ".to_string(),
            history_file: None,
            history_size: 1000,
            hup_on_exit: false,
            notify: true,
        }
    }
}

impl ReplConfig {
    /// Load the user's config file, or defaults if there is none.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Where history is read from and saved to.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file.clone().or_else(|| {
            BaseDirs::new().map(|b| b.data_dir().join("kumish").join("history.txt"))
        })
    }
}

/// `$XDG_CONFIG_HOME/kumish/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "kumish").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(ReplConfig::parse("").expect("parses"), ReplConfig::default());
    }

    #[test]
    fn keys_override_defaults() {
        let config = ReplConfig::parse(
            r#"
            prompt = "> "
            history_size = 50
            hup_on_exit = true
            notify = false
            history_file = "/tmp/kumish-history"
            "#,
        )
        .expect("parses");

        assert_eq!(config.prompt, "> ");
        assert_eq!(config.history_size, 50);
        assert!(config.hup_on_exit);
        assert!(!config.notify);
        assert_eq!(config.history_path(), Some(PathBuf::from("/tmp/kumish-history")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ReplConfig::parse("colour = true").is_err());
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(ReplConfig::parse("history_size = \"lots\"").is_err());
    }

    #[test]
    fn from_file_names_the_file() {
        let path = std::env::temp_dir().join(format!("kumish-config-{}.toml", std::process::id()));
        std::fs::write(&path, "notify = 3").expect("write config");
        let err = ReplConfig::from_file(&path).expect_err("bad type");
        std::fs::remove_file(&path).ok();
        assert!(format!("{err:#}").contains("Invalid config"));
    }
}
