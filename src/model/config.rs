use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub data_dir: String,
    pub root_name: String,
    pub log_filter: String,
    /// Theme used until the user toggles and the choice is stored.
    pub dark_mode_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    pub max_text_bytes: usize,
    pub highlight: bool,
    pub syntax_theme: String,
    pub light_syntax_theme: String,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let user = match config_path() {
            Some(path) if path.exists() => Some(fs::read_to_string(&path)?),
            _ => None,
        };
        let mut config = Self::from_layers(user.as_deref())?;

        if config.general.data_dir.starts_with('~') {
            let home = dirs_home().ok_or_else(|| anyhow!("cannot determine home directory"))?;
            config.general.data_dir =
                config
                    .general
                    .data_dir
                    .replacen('~', &home.to_string_lossy(), 1);
        }

        Ok(config)
    }

    /// Defaults with `user` merged over them table by table.
    pub fn from_layers(user: Option<&str>) -> Result<Self> {
        let mut merged: toml::Table = toml::from_str(DEFAULTS)?;
        if let Some(user) = user {
            let overrides: toml::Table = toml::from_str(user)?;
            merge_tables(&mut merged, overrides);
        }
        Ok(toml::Value::Table(merged).try_into()?)
    }

    /// Directory holding the storage slots.
    pub fn data_dir(&self) -> PathBuf {
        if !self.general.data_dir.trim().is_empty() {
            return PathBuf::from(&self.general.data_dir);
        }

        directories::ProjectDirs::from("", "", "treeshelf")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".treeshelf"))
    }
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "treeshelf")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
