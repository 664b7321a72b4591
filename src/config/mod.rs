use serde::Deserialize;
use serde_with::serde_as;
use serde_with::DurationSeconds;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::store::file::DEFAULT_FILE;
use crate::schedule::{MAX_TEMPERATURE, MIN_TEMPERATURE};

#[derive(Deserialize, Clone)]
pub struct Config {
    home_assistant: HomeAssistantConfig,
    #[serde(default)]
    store: StoreConfig,
    #[serde(default)]
    editor: EditorConfig,
    #[serde(default)]
    devices: Vec<DeviceConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: Config = toml::from_str(&config)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for device in &self.devices {
            if device.id.trim().is_empty() {
                return Err(ConfigError::Invalid("device with an empty id".to_owned()));
            }
            if let Some(temp) = device.default_temperature {
                if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temp) {
                    return Err(ConfigError::Invalid(format!(
                        "default_temperature {} of {} is not within {}-{}",
                        temp, device.id, MIN_TEMPERATURE, MAX_TEMPERATURE
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn get_home_assistant(&self) -> &HomeAssistantConfig {
        &self.home_assistant
    }

    pub fn get_store(&self) -> &StoreConfig {
        &self.store
    }

    pub fn get_editor(&self) -> &EditorConfig {
        &self.editor
    }

    pub fn get_devices(&self) -> &[DeviceConfig] {
        &self.devices
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(path, e) => write!(f, "Unable to read {:?}: {}", path, e),
            ConfigError::Parse(path, e) => write!(f, "Error reading {:?}: {}", path, e),
            ConfigError::Invalid(e) => write!(f, "Invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct HomeAssistantConfig {
    /// Base url of the Home Assistant instance, e.g. http://homeassistant.local:8123
    url: String,
    /// Long lived access token
    token: String,
    /// How long to wait (in seconds) for the publish service call before treating it as failed.
    #[serde_as(as = "DurationSeconds")]
    #[serde(default = "default_timeout")]
    timeout_secs: Duration,
    /// Whether the broker should retain the published schedule
    #[serde(default)]
    retain: bool,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl HomeAssistantConfig {
    pub fn get_url(&self) -> &str {
        &self.url
    }

    pub fn get_token(&self) -> &str {
        &self.token
    }

    pub fn get_timeout(&self) -> &Duration {
        &self.timeout_secs
    }

    pub fn should_retain(&self) -> bool {
        self.retain
    }
}

#[derive(Deserialize, Clone)]
pub struct StoreConfig {
    /// The JSON document holding every device's last applied schedule.
    file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_FILE),
        }
    }
}

impl StoreConfig {
    pub fn get_file(&self) -> &PathBuf {
        &self.file
    }
}

#[derive(Deserialize, Clone, Default)]
pub struct EditorConfig {
    /// Edit Monday to Thursday as a single block.
    #[serde(default)]
    merge_weekdays: bool,
}

impl EditorConfig {
    pub fn should_merge_weekdays(&self) -> bool {
        self.merge_weekdays
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct DeviceConfig {
    /// The zigbee2mqtt friendly name of the valve.
    id: String,
    /// Display name, e.g. the room.
    name: Option<String>,
    /// Used for every transition not yet edited, instead of the standard day ladder.
    default_temperature: Option<f32>,
}

impl DeviceConfig {
    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn get_default_temperature(&self) -> Option<f32> {
        self.default_temperature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize() {
        let config = Config::load(Path::new("test/testconfig.toml"))
            .expect("Unable to read test config file. Is it missing?");

        assert_eq!(config.home_assistant.url, "http://homeassistant.local:8123");
        assert_eq!(config.home_assistant.token, "super-secret-token");
        assert_eq!(config.home_assistant.timeout_secs, Duration::from_secs(5));
        assert!(config.home_assistant.retain);

        assert_eq!(config.store.file, PathBuf::from("/config/.valve.settings.json"));
        assert!(config.editor.should_merge_weekdays());

        assert_eq!(config.devices.len(), 3);
        assert_eq!(config.devices[0].get_id(), "thermostat_livingroom_1");
        assert_eq!(config.devices[0].get_name(), "Living Room Terrace");
        assert_eq!(config.devices[1].get_name(), "thermostat_kitchen");
        assert_eq!(config.devices[2].get_default_temperature(), Some(22.0));
    }

    #[test]
    fn defaults() {
        let config: Config = toml::from_str(
            r#"
            [home_assistant]
            url = "http://localhost:8123"
            token = "t"
            "#,
        )
        .unwrap();
        assert_eq!(*config.get_home_assistant().get_timeout(), Duration::from_secs(10));
        assert!(!config.get_home_assistant().should_retain());
        assert_eq!(config.get_store().get_file(), &PathBuf::from(".valve.settings.json"));
        assert!(!config.get_editor().should_merge_weekdays());
        assert!(config.get_devices().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_default_temperature() {
        let config: Config = toml::from_str(
            r#"
            [home_assistant]
            url = "http://localhost:8123"
            token = "t"

            [[devices]]
            id = "thermostat_bath"
            default_temperature = 40
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
