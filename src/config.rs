use crate::domain::IDLE_LABEL;
use crate::page::WaitPolicy;
use crate::persistence::get_data_dir;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronologConfig {
    /// Label of the session that runs while no task is tracked
    #[serde(default = "default_idle_label")]
    pub idle_label: String,

    /// How long to wait for the host page's editor, in milliseconds
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub table: TableWidths,

    /// Overrides the `.chronolog` lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Column widths of the exported Markdown table, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableWidths {
    #[serde(default = "default_start_width")]
    pub start_width: usize,
    #[serde(default = "default_name_width")]
    pub name_width: usize,
    #[serde(default = "default_spent_width")]
    pub spent_width: usize,
}

fn default_idle_label() -> String {
    IDLE_LABEL.to_string()
}

fn default_wait_timeout_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_start_width() -> usize {
    5
}

fn default_name_width() -> usize {
    37
}

fn default_spent_width() -> usize {
    7
}

impl Default for TableWidths {
    fn default() -> Self {
        Self {
            start_width: default_start_width(),
            name_width: default_name_width(),
            spent_width: default_spent_width(),
        }
    }
}

impl Default for ChronologConfig {
    fn default() -> Self {
        Self {
            idle_label: default_idle_label(),
            wait_timeout_ms: default_wait_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            table: TableWidths::default(),
            data_dir: None,
        }
    }
}

impl ChronologConfig {
    pub fn config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Cannot determine config directory")?
            .join("chronolog")
            .join("config.toml"))
    }

    /// Load config from disk. Returns default config if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_millis(self.wait_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// Configured data directory, else the nearest `.chronolog`, else `~/.chronolog`
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_data_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ChronologConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ChronologConfig::default());
        assert_eq!(config.wait_policy(), WaitPolicy::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "idle_label = \"Break\"\ndata_dir = \"/tmp/chronolog\"\n\n[table]\nname_width = 20\n",
        )
        .unwrap();

        let config = ChronologConfig::load_from(&path).unwrap();
        assert_eq!(config.idle_label, "Break");
        assert_eq!(config.wait_timeout_ms, 2000);
        assert_eq!(
            config.table,
            TableWidths {
                name_width: 20,
                ..TableWidths::default()
            }
        );
        assert_eq!(
            config.resolve_data_dir().unwrap(),
            PathBuf::from("/tmp/chronolog")
        );
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "wait_timeout_ms = \"soon\"").unwrap();
        assert!(ChronologConfig::load_from(&path).is_err());
    }
}
