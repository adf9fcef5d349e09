//! Configuration management for drivelog

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::logging::{Level, BYTES_PER_MB};

/// Name of the config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "drivelog.toml";

/// Categories of disk errors for user-friendly messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    /// Get a user-friendly message for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full, log records are being dropped",
            DiskErrorKind::PermissionDenied => "permission denied writing to the log directory",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::Other => "I/O failure",
        }
    }
}

/// Categorize an IO error into a user-friendly category
pub fn categorize_io_error(e: &std::io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        // On some systems, disk full appears as WriteZero
        ErrorKind::WriteZero => DiskErrorKind::DiskFull,

        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,

        ErrorKind::NotFound => DiskErrorKind::NotFound,

        // Check raw OS error for disk full on Unix
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC = 28 on Linux and macOS
                    // EDQUOT = 122 on Linux, 69 on macOS
                    if os_error == libc::ENOSPC || os_error == libc::EDQUOT {
                        return DiskErrorKind::DiskFull;
                    }
                    if os_error == libc::EACCES {
                        return DiskErrorKind::PermissionDenied;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

/// Create a user-friendly error message from an IO error
pub fn friendly_io_error_message(e: &std::io::Error, context: &str) -> String {
    let kind = categorize_io_error(e);
    match kind {
        DiskErrorKind::Other => format!("{}: {}", context, e),
        _ => format!("{}: {}", context, kind.user_message()),
    }
}

/// Logging manager settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Directory holding main.log and the special channel files (created if absent)
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Level given to every channel at creation
    #[serde(default = "default_level")]
    pub default_level: Level,

    /// Mirror the root channel to stdout
    #[serde(default = "default_true")]
    pub enable_console: bool,

    /// Write main.log and the special channel files
    #[serde(default = "default_true")]
    pub enable_file: bool,

    /// Size at which a log file is rotated, in megabytes (0 disables rotation)
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Rotated generations kept per file
    #[serde(default = "default_backup_count")]
    pub backup_count: usize,

    /// Forward `tracing` events from the whole process into channels
    #[serde(default = "default_true")]
    pub capture_tracing: bool,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_level() -> Level {
    Level::Info
}

fn default_true() -> bool {
    true
}

fn default_max_file_size_mb() -> u64 {
    10
}

fn default_backup_count() -> usize {
    5
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            default_level: default_level(),
            enable_console: true,
            enable_file: true,
            max_file_size_mb: default_max_file_size_mb(),
            backup_count: default_backup_count(),
            capture_tracing: true,
        }
    }
}

impl LoggingConfig {
    /// Rotation threshold in bytes
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(BYTES_PER_MB)
    }
}

/// Live log overlay settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlayConfig {
    /// Title of the display surface
    #[serde(default = "default_window_name")]
    pub window_name: String,

    /// Canvas width in pixels (default: 1000)
    #[serde(default = "default_width")]
    pub width: u32,

    /// Canvas height in pixels (default: 600)
    #[serde(default = "default_height")]
    pub height: u32,

    /// Records kept in the ring buffer (default: 100)
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// Vertical distance between rendered lines in pixels (default: 20)
    #[serde(default = "default_line_height")]
    pub line_height: u32,
}

fn default_window_name() -> String {
    "System Logs".to_string()
}

fn default_width() -> u32 {
    1000
}

fn default_height() -> u32 {
    600
}

fn default_max_lines() -> usize {
    100
}

fn default_line_height() -> u32 {
    20
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            window_name: default_window_name(),
            width: default_width(),
            height: default_height(),
            max_lines: default_max_lines(),
            line_height: default_line_height(),
        }
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub overlay: OverlayConfig,
}

impl Config {
    /// Load configuration from the first config file found, or defaults
    ///
    /// Looks for `./drivelog.toml`, then `~/.drivelog/config.toml`.
    pub fn load() -> Result<Self> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load_from(&local);
        }
        match try_config_dir() {
            Some(dir) => Self::load_from(&dir.join("config.toml")),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from `path`, or return default if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}

/// Get the per-user configuration directory (~/.drivelog), if a home exists
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".drivelog"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.default_level, Level::Info);
        assert!(config.enable_console);
        assert!(config.enable_file);
        assert_eq!(config.max_file_size_mb, 10);
        assert_eq!(config.backup_count, 5);
        assert_eq!(config.max_file_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_default_overlay_config() {
        let config = OverlayConfig::default();
        assert_eq!(config.window_name, "System Logs");
        assert_eq!((config.width, config.height), (1000, 600));
        assert_eq!(config.max_lines, 100);
        assert_eq!(config.line_height, 20);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [logging]
            default_level = "debug"
            backup_count = 2
            "#,
        )
        .unwrap();

        assert_eq!(parsed.logging.default_level, Level::Debug);
        assert_eq!(parsed.logging.backup_count, 2);
        assert_eq!(parsed.logging.max_file_size_mb, 10);
        assert_eq!(parsed.overlay, OverlayConfig::default());
    }

    #[test]
    fn test_level_serializes_upper_case() {
        let config = LoggingConfig {
            default_level: Level::Warning,
            ..LoggingConfig::default()
        };
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("default_level = \"WARNING\""));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        let mut config = Config::default();
        config.logging.enable_console = false;
        config.overlay.max_lines = 250;

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_bad_level() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[logging]\ndefault_level = \"LOUD\"\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_friendly_io_error_message() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(
            friendly_io_error_message(&denied, "Failed to write main.log"),
            "Failed to write main.log: permission denied writing to the log directory"
        );

        let other = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(friendly_io_error_message(&other, "ctx"), "ctx: boom");
    }

    #[test]
    fn test_try_config_dir() {
        if let Some(path) = try_config_dir() {
            assert!(path.ends_with(".drivelog"));
        }
    }
}
