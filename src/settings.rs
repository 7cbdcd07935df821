use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Defaults for paths not given on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// AF master table (xlsx or csv) used when `--master` is not given.
    #[serde(default = "default_master_path")]
    pub master_path: String,
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_path: default_master_path(),
            export_dir: default_export_dir(),
        }
    }
}

impl Settings {
    pub fn master_path(&self) -> PathBuf {
        PathBuf::from(shellexpand_path(&self.master_path))
    }

    pub fn export_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand_path(&self.export_dir))
    }
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_master_path() -> String {
    "AFマスター.xlsx".to_string()
}

fn default_export_dir() -> String {
    home().join("Documents").join("cvcost").to_string_lossy().into_owned()
}

pub fn settings_path() -> PathBuf {
    home().join(".config").join("cvcost").join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

/// A missing file gives the defaults; an unreadable one is logged and
/// also falls back to the defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Settings::default();
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
        Settings::default()
    })
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ReportError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

/// Expand a leading `~` and make existing paths absolute.
pub fn shellexpand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') {
            return format!("{}{rest}", home().display());
        }
    }
    std::fs::canonicalize(path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            master_path: "/data/AFマスター.xlsx".to_string(),
            export_dir: "/tmp/exports".to_string(),
        };
        save_settings_to(&settings, &path).unwrap();
        assert_eq!(load_settings_from(&path), settings);
    }

    #[test]
    fn test_missing_or_broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(load_settings_from(&path), Settings::default());
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_settings_from(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let json = r#"{"master_path": "/srv/master.csv"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.master_path, "/srv/master.csv");
        assert!(s.export_dir.ends_with("cvcost"));
    }

    #[test]
    fn test_shellexpand_tilde() {
        let expanded = shellexpand_path("~/reports");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/reports"));
        assert_eq!(shellexpand_path("~user/x"), "~user/x");
        assert_eq!(shellexpand_path("relative/missing.xlsx"), "relative/missing.xlsx");
    }
}
