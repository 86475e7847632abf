//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_TERM";

/// Config file name inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config file name looked up in the current directory
const LOCAL_CONFIG_FILE_NAME: &str = "serial-term.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_TERM_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERIAL_TERM_CONFIG` environment variable (explicit path)
    /// 2. `./serial-term.toml` (current directory)
    /// 3. `<platform config dir>/serial-term/config.toml`
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match &config_path {
            Some(path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        if apply_env_overrides(&mut config).is_err() || config.validate().is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to the file it was loaded from.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| ConfigError::MissingRequired("No config file path set".to_string()))?;

        save_to_file(&self.config, path)
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "serial-term").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    debug!("Loading configuration from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn env_var(section_key: &str) -> Option<(String, String)> {
    let var = format!("{ENV_PREFIX}_{section_key}");
    std::env::var(&var).ok().map(|val| (var, val))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERIAL_TERM_<SECTION>_<KEY>`
/// For example:
/// - `SERIAL_TERM_SERIAL_DEFAULT_PORT=/dev/ttyUSB0`
/// - `SERIAL_TERM_SERIAL_DEFAULT_BAUD=9600`
/// - `SERIAL_TERM_SERIAL_IO_MODE=polling`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some((_, val)) = env_var("SERIAL_DEFAULT_PORT") {
        config.serial.default_port = Some(val);
    }
    if let Some((var, val)) = env_var("SERIAL_DEFAULT_BAUD") {
        config.serial.default_baud = val
            .parse()
            .map_err(|_| ConfigError::env_parse(var, "Invalid baud rate"))?;
    }
    if let Some((var, val)) = env_var("SERIAL_IO_MODE") {
        config.serial.io_mode = val.parse().map_err(|e: String| ConfigError::env_parse(var, e))?;
    }
    if let Some((var, val)) = env_var("SERIAL_READ_TIMEOUT_MS") {
        config.serial.read_timeout_ms = val
            .parse()
            .map_err(|_| ConfigError::env_parse(var, "Invalid timeout"))?;
    }
    if let Some((var, val)) = env_var("SERIAL_POLL_INTERVAL_MS") {
        config.serial.poll_interval_ms = val
            .parse()
            .map_err(|_| ConfigError::env_parse(var, "Invalid interval"))?;
    }

    if let Some((var, val)) = env_var("TERMINAL_LINE_ENDING") {
        config.terminal.line_ending =
            val.parse().map_err(|e: String| ConfigError::env_parse(var, e))?;
    }
    if let Some((_, val)) = env_var("TERMINAL_THEME") {
        config.terminal.theme = val;
    }

    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some((_, val)) = env_var("LOGGING_FILE") {
        config.logging.file = Some(PathBuf::from(val));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LineEnding;
    use crate::session::IoMode;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().serial.default_baud, 115_200);
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("SERIAL_TERM_SERIAL_DEFAULT_BAUD", "9600");
        env::set_var("SERIAL_TERM_SERIAL_IO_MODE", "polling");
        env::set_var("SERIAL_TERM_TERMINAL_LINE_ENDING", "cr");

        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().serial.default_baud, 9600);
        assert_eq!(loader.config().serial.io_mode, IoMode::Polling);
        assert_eq!(loader.config().terminal.line_ending, LineEnding::Cr);

        env::remove_var("SERIAL_TERM_SERIAL_DEFAULT_BAUD");
        env::remove_var("SERIAL_TERM_SERIAL_IO_MODE");
        env::remove_var("SERIAL_TERM_TERMINAL_LINE_ENDING");
    }

    #[test]
    #[serial]
    fn test_invalid_env_override_falls_back_to_defaults() {
        env::set_var("SERIAL_TERM_SERIAL_DEFAULT_BAUD", "4800");

        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().serial.default_baud, 115_200);

        env::remove_var("SERIAL_TERM_SERIAL_DEFAULT_BAUD");
    }

    #[test]
    #[serial]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("serial-term.toml");

        let mut loader = ConfigLoader::with_defaults();
        loader.config.serial.default_port = Some("/dev/ttyUSB3".to_string());
        loader.config.serial.default_baud = 38400;
        loader.save_to(&path).unwrap();

        let reloaded = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(
            reloaded.config().serial.default_port.as_deref(),
            Some("/dev/ttyUSB3")
        );
        assert_eq!(reloaded.config().serial.default_baud, 38400);
        assert_eq!(reloaded.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    #[serial]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_from(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    #[serial]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[serial]\ndefault_baud = 57600\n").unwrap();

        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_save_without_path() {
        let loader = ConfigLoader {
            config_path: None,
            config: Config::default(),
        };
        assert!(matches!(loader.save(), Err(ConfigError::MissingRequired(_))));
    }
}
