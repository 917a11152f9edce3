use crate::error::{LynkuiError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_URL_ENTRY_PATH: &str = "/lynkui";
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;
pub const LAYOUT_FILE: &str = "data-layout.json";
pub const DATA_FILE: &str = "data-objects.json";
pub const LOCAL_INSTANCE: &str = "index";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub app_project_path: PathBuf,
    /// Standard assets root, watched alongside the project in dev mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_path: Option<PathBuf>,
    #[serde(default = "default_url_entry_path")]
    pub url_entry_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub run_mode: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_url_entry_path() -> String {
    DEFAULT_URL_ENTRY_PATH.to_string()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            app_project_path: PathBuf::new(),
            assets_path: None,
            url_entry_path: default_url_entry_path(),
            run_mode: String::new(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl ServiceConfig {
    pub fn new(app_project_path: impl Into<PathBuf>) -> Self {
        Self {
            app_project_path: app_project_path.into(),
            ..Default::default()
        }
    }

    /// Read a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| LynkuiError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Fill defaults, absolutize paths and check that they exist.
    pub fn prepare(mut self) -> Result<Self> {
        if self.url_entry_path.trim().is_empty() {
            self.url_entry_path = default_url_entry_path();
        }
        let trimmed = self.url_entry_path.trim_end_matches('/');
        self.url_entry_path = if trimmed.is_empty() {
            "/".to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };

        if self.app_project_path.as_os_str().is_empty() {
            return Err(LynkuiError::Config("app_project_path not setup".to_string()));
        }
        self.app_project_path = existing_dir(&self.app_project_path)?;
        tracing::info!("setup app project path : {}", self.app_project_path.display());

        if self.run_mode != "dev" {
            self.run_mode = "prod".to_string();
        }

        if let Some(assets) = self.assets_path.take() {
            self.assets_path = Some(existing_dir(&assets)?);
        }

        if self.debounce_ms == 0 {
            self.debounce_ms = DEFAULT_DEBOUNCE_MS;
        }

        Ok(self)
    }

    pub fn is_dev(&self) -> bool {
        self.run_mode == "dev"
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn layout_file(&self) -> PathBuf {
        self.app_project_path.join(LAYOUT_FILE)
    }

    pub fn data_file(&self) -> PathBuf {
        self.app_project_path.join(DATA_FILE)
    }
}

fn existing_dir(path: &Path) -> Result<PathBuf> {
    let abs = std::path::absolute(path)?;
    let meta = std::fs::metadata(&abs)
        .map_err(|e| LynkuiError::Config(format!("{}: {}", abs.display(), e)))?;
    if !meta.is_dir() {
        return Err(LynkuiError::Config(format!(
            "{} is not a directory",
            abs.display()
        )));
    }
    Ok(abs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ServiceConfig {
            url_entry_path: "ui/".to_string(),
            run_mode: "staging".to_string(),
            debounce_ms: 0,
            ..ServiceConfig::new(dir.path())
        }
        .prepare()
        .unwrap();

        assert_eq!(cfg.url_entry_path, "/ui");
        assert_eq!(cfg.run_mode, "prod");
        assert!(!cfg.is_dev());
        assert_eq!(cfg.debounce_window(), Duration::from_millis(1000));
        assert!(cfg.app_project_path.is_absolute());
        assert_eq!(cfg.layout_file(), cfg.app_project_path.join("data-layout.json"));
    }

    #[test]
    fn test_prepare_rejects_missing_paths() {
        let err = ServiceConfig::default().prepare().unwrap_err();
        assert!(matches!(err, LynkuiError::Config(_)));

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(ServiceConfig::new(&missing).prepare().is_err());

        let cfg = ServiceConfig {
            assets_path: Some(missing),
            ..ServiceConfig::new(dir.path())
        };
        assert!(cfg.prepare().is_err());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lynkui.toml");
        std::fs::write(
            &path,
            "app_project_path = \"./project\"\nrun_mode = \"dev\"\ndebounce_ms = 250\n",
        )
        .unwrap();

        let cfg = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(cfg.app_project_path, PathBuf::from("./project"));
        assert!(cfg.is_dev());
        assert_eq!(cfg.debounce_ms, 250);
        assert_eq!(cfg.url_entry_path, "/lynkui");
    }
}
