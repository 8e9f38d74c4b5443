use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{FactorError, Result};

#[cfg(feature = "xlsx")]
const SAMPLE_EXT: &str = "xlsx";
#[cfg(not(feature = "xlsx"))]
const SAMPLE_EXT: &str = "csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: String,
    pub invoices_file: String,
    pub rates_file: String,
    /// ISO date pinning days-to-due; today when unset.
    pub reference_date: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            invoices_file: format!("facturas_ejemplo.{SAMPLE_EXT}"),
            rates_file: format!("estructura_tasas.{SAMPLE_EXT}"),
            reference_date: None,
        }
    }
}

impl Settings {
    /// Default invoice sheet. Relative names resolve against `data_dir`.
    pub fn invoices_path(&self) -> PathBuf {
        self.resolve(&self.invoices_file)
    }

    pub fn rates_path(&self) -> PathBuf {
        self.resolve(&self.rates_file)
    }

    pub fn exports_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("exports")
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let path = PathBuf::from(shellexpand_path(file));
        if path.is_absolute() {
            path
        } else {
            PathBuf::from(&self.data_dir).join(path)
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("factor")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("factor")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(&path).unwrap_or_default();
    match serde_json::from_str(&content) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "unreadable settings, using defaults");
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| FactorError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

/// Expand a leading `~` to the home directory.
pub fn shellexpand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_json() {
        let settings = Settings {
            data_dir: "/tmp/factor".to_string(),
            invoices_file: "q3.csv".to_string(),
            rates_file: "/srv/tasas.xlsx".to_string(),
            reference_date: Some("2025-06-01".to_string()),
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let s: Settings = serde_json::from_str(r#"{"data_dir": "/tmp/x"}"#).unwrap();
        assert_eq!(s.data_dir, "/tmp/x");
        assert!(s.invoices_file.starts_with("facturas_ejemplo."));
        assert!(s.rates_file.starts_with("estructura_tasas."));
        assert_eq!(s.reference_date, None);
    }

    #[test]
    fn test_default_has_data_dir() {
        let s = Settings::default();
        assert!(s.data_dir.ends_with("factor"));
    }

    #[test]
    fn test_relative_files_resolve_against_data_dir() {
        let s = Settings {
            data_dir: "/data".to_string(),
            invoices_file: "f.csv".to_string(),
            rates_file: "/abs/r.csv".to_string(),
            reference_date: None,
        };
        assert_eq!(s.invoices_path(), PathBuf::from("/data/f.csv"));
        assert_eq!(s.rates_path(), PathBuf::from("/abs/r.csv"));
        assert_eq!(s.exports_dir(), PathBuf::from("/data/exports"));
    }

    #[test]
    fn test_shellexpand_leaves_plain_paths() {
        assert_eq!(shellexpand_path("/a/b"), "/a/b");
        assert_eq!(shellexpand_path("rel/c"), "rel/c");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(shellexpand_path("~/x"), format!("{}/x", home.to_string_lossy()));
        }
    }
}
