// bmk/src/config.rs
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Environment-configurable defaults for collaborators. The core takes
/// absolute paths; this module only resolves where they come from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Directory where backup snapshots are written.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// Text editor used by edit flows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            backup_dir: default_backup_dir(),
            editor: None,
        }
    }
}

fn config_home() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("bmk"))
        .unwrap_or_else(|| PathBuf::from(".bmk"))
}

fn default_db_path() -> String {
    config_home().join("bookmarks.db").to_string_lossy().into_owned()
}

fn default_backup_dir() -> String {
    config_home().join("backup").to_string_lossy().into_owned()
}

impl Settings {
    /// Load settings from `<config dir>/bmk/config.toml` when present, then
    /// apply `BMK_*` environment overrides. Unreadable files fall back to
    /// the defaults with a warning.
    pub fn load() -> Self {
        let mut settings = Self::from_config_file().unwrap_or_default();
        settings.apply_env_overrides();
        settings
    }

    fn from_config_file() -> Option<Self> {
        let path = config_home().join("config.toml");
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<Settings>(&content) {
                Ok(settings) => {
                    debug!("settings loaded from {}", path.display());
                    Some(settings)
                }
                Err(e) => {
                    warn!("ignoring malformed config {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("cannot read config {}: {}", path.display(), e);
                None
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(db_path) = env::var("BMK_DB_PATH") {
            if !db_path.is_empty() {
                self.db_path = db_path;
            }
        }
        if let Ok(backup_dir) = env::var("BMK_BACKUP_DIR") {
            if !backup_dir.is_empty() {
                self.backup_dir = backup_dir;
            }
        }
        if let Ok(editor) = env::var("BMK_EDITOR") {
            if !editor.is_empty() {
                self.editor = Some(editor);
            }
        }
    }
}
