// Configuration management for tapdeck
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub reader: ReaderConfig,
    pub playback: PlaybackConfig,
    pub standby: StandbyConfig,
    pub provision: ProvisionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub location: String,
    pub connect_attempts: u32,
    pub connect_retry_ms: u64,
    pub poll_interval_ms: u64,
    /// Hex encoded discovery request sent to the reader before the first connect.
    pub probe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub retry_interval_ms: u64,
    pub retry_attempts: u32,
    pub watch_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StandbyConfig {
    pub cooldown_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub default_directory: Option<PathBuf>,
    pub display: DisplayMode,
    pub path_check: PathCheck,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Daily rotating log files go here when set.
    pub directory: Option<PathBuf>,
}

/// Which folder picker the provisioning mode uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Graphical picker when a display server is reachable, terminal prompt otherwise
    #[default]
    Auto,
    Gui,
    Terminal,
}

/// How strictly a chosen media path is validated before it is bound to a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PathCheck {
    /// Must be an audio file or a folder holding at least one
    #[default]
    Audio,
    /// Any existing path is accepted
    Exists,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = Self::app_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            database_path: data_dir.join("tapdeck.db"),
            reader: ReaderConfig::default(),
            playback: PlaybackConfig::default(),
            standby: StandbyConfig::default(),
            provision: ProvisionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            location: format!("spool:{}", default_spool_dir().display()),
            connect_attempts: 3,
            connect_retry_ms: 1000,
            poll_interval_ms: 500,
            probe: "0012FC0000".to_string(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 500,
            retry_attempts: 6, // 3 second ceiling
            watch_interval_ms: 500,
        }
    }
}

impl Default for StandbyConfig {
    fn default() -> Self {
        Self { cooldown_ms: 2000 }
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            default_directory: dirs::audio_dir(),
            display: DisplayMode::Auto,
            path_check: PathCheck::Audio,
        }
    }
}

/// Spool directory the reader watches unless told otherwise.
fn default_spool_dir() -> PathBuf {
    Config::app_dir().unwrap_or_else(|| PathBuf::from(".")).join("reader")
}

impl ReaderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_retry(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }

    /// Decodes the probe string, ignoring it entirely if it is not valid hex.
    pub fn probe_bytes(&self) -> Option<Vec<u8>> {
        hex::decode(self.probe.trim()).ok().filter(|bytes| !bytes.is_empty())
    }
}

impl PlaybackConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}

impl StandbyConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Config {
    /// Loads from `path`, or from the default location when `path` is None.
    /// A missing default file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            if path.is_none() {
                config.save_to(&config_path)?;
            }
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;

        Ok(())
    }

    fn app_dir() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("tapdeck"))
    }

    fn config_path() -> Result<PathBuf> {
        let dir = Self::app_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;

        Ok(dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_timings() {
        let config = Config::default();
        assert_eq!(config.playback.retry_interval(), Duration::from_millis(500));
        assert_eq!(config.playback.retry_attempts, 6);
        assert_eq!(config.standby.cooldown(), Duration::from_secs(2));
        assert_eq!(config.reader.probe_bytes(), Some(vec![0x00, 0x12, 0xFC, 0x00, 0x00]));
    }

    #[test]
    fn test_default_location_is_a_spool_dir() {
        let reader = ReaderConfig::default();
        let dir = reader.location.strip_prefix("spool:").unwrap();
        assert!(Path::new(dir).ends_with("reader"));
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[reader]\nlocation = \"/tmp/spool\"\n\n[provision]\npath_check = \"exists\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.reader.location, "/tmp/spool");
        assert_eq!(config.reader.connect_attempts, 3);
        assert_eq!(config.provision.path_check, PathCheck::Exists);
        assert_eq!(config.provision.display, DisplayMode::Auto);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.standby.cooldown_ms = 10;
        config.save_to(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.standby.cooldown_ms, 10);
    }

    #[test]
    fn test_bad_probe_is_ignored() {
        let reader = ReaderConfig { probe: "12F".into(), ..ReaderConfig::default() };
        assert_eq!(reader.probe_bytes(), None);
        let reader = ReaderConfig { probe: "zz".into(), ..ReaderConfig::default() };
        assert_eq!(reader.probe_bytes(), None);
        let reader = ReaderConfig { probe: "".into(), ..ReaderConfig::default() };
        assert_eq!(reader.probe_bytes(), None);
        let reader = ReaderConfig { probe: " 0012fc0000\n".into(), ..ReaderConfig::default() };
        assert_eq!(reader.probe_bytes(), Some(vec![0x00, 0x12, 0xFC, 0x00, 0x00]));
    }
}
