//! Application configuration
//!
//! Read once at startup from `<config dir>/photo-templater/config.json`.
//! Every field is optional in the file; missing fields take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "photo-templater";
const CONFIG_FILE: &str = "config.json";
const DATABASE_FILE: &str = "photo_template.db";
const TEMPLATE_IMAGES_DIR: &str = "template_images";
const GENERATED_IMAGES_DIR: &str = "generated_images";

/// Default verbosity, overridden by `RUST_LOG`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter string understood by env_logger
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the database, uploads and generated images live
    pub data_dir: PathBuf,
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
            log_level: LogLevel::default(),
        }
    }
}

impl AppConfig {
    /// Path of the config file, if the platform has a config dir
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the standard location, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`. A missing file gives the defaults; a malformed one is
    /// reported and ignored.
    ///
    /// Runs before the logger exists, so problems go to stderr.
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                eprintln!("⚠️  Could not read {}: {}, using defaults", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("⚠️  Invalid config {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join(TEMPLATE_IMAGES_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join(GENERATED_IMAGES_DIR)
    }
}

/// Install the global logger. `RUST_LOG` wins over the configured level.
pub fn init_logging(level: LogLevel) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_filter()))
        .format_timestamp_millis()
        .init();
}
