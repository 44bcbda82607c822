use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Persisted settings. Everything has a default so a missing or partial
/// file still yields a working configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the queue server; the realtime channel URL derives
    /// from it.
    pub web_url: String,
    /// Shared secret traded for the `X-App-Token` at startup. Must match
    /// the server's configured value.
    pub app_secret: String,
    /// Which service desk this client instance represents.
    pub counter_id: i64,
    /// Seconds a dropped connection may stay silent before alarming.
    pub grace_seconds: u64,
    /// Seconds after calling a patient before the validation reminder.
    pub validate_reminder_seconds: u64,
    pub toast_duration_seconds: u64,
    /// 0-100.
    pub sound_volume: u8,
    pub notify: NotifyPrefs,
    pub shortcuts: Shortcuts,
}

/// Per-category notification toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyPrefs {
    pub current_patient: bool,
    pub autocalling: bool,
    pub specific_acts: bool,
    pub add_paper: bool,
    pub connection: bool,
}

impl Default for NotifyPrefs {
    fn default() -> Self {
        NotifyPrefs {
            current_patient: true,
            autocalling: true,
            specific_acts: true,
            add_paper: true,
            connection: true,
        }
    }
}

/// Keyboard shortcuts for the quick actions, in the platform's
/// modifier+key notation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shortcuts {
    pub next_patient: String,
    pub validate_patient: String,
    pub pause_patient: String,
    pub recall_patient: String,
    pub logout: String,
}

impl Default for Shortcuts {
    fn default() -> Self {
        Shortcuts {
            next_patient: "Alt+S".to_string(),
            validate_patient: "Alt+V".to_string(),
            pause_patient: "Alt+P".to_string(),
            recall_patient: "Alt+R".to_string(),
            logout: "Alt+D".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            web_url: "https://gestionfile.onrender.com".to_string(),
            app_secret: "votre_secret_app".to_string(),
            counter_id: 1,
            grace_seconds: 10,
            validate_reminder_seconds: 60,
            toast_duration_seconds: 5,
            sound_volume: 50,
            notify: NotifyPrefs::default(),
            shortcuts: Shortcuts::default(),
        }
    }
}

impl Config {
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_seconds)
    }

    pub fn validate_reminder(&self) -> Duration {
        Duration::from_secs(self.validate_reminder_seconds)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_secs(self.toast_duration_seconds)
    }

    /// How this client introduces itself to the server.
    pub fn client_name(&self) -> String {
        format!("Counter {} App", self.counter_id)
    }
}

/// Return the path to the config file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("pharma-counter/config.toml")
}

/// Load the config, falling back to defaults when the file does not exist
/// yet. A file that exists but fails to parse is an error: silently
/// ignoring it would connect the app to the wrong server.
pub fn load() -> Result<Config, ConfigError> {
    let path = config_file_path();
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(toml::from_str(&content)?)
}

/// Persist the config, creating the parent directory if needed.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_file_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.grace(), Duration::from_secs(10));
        assert_eq!(config.counter_id, 1);
        assert!(config.notify.connection);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
web_url = "http://localhost:5000"
counter_id = 3
grace_seconds = 20

[notify]
connection = false
"#,
        )
        .unwrap();
        assert_eq!(config.web_url, "http://localhost:5000");
        assert_eq!(config.counter_id, 3);
        assert_eq!(config.grace(), Duration::from_secs(20));
        assert!(!config.notify.connection);
        assert!(config.notify.add_paper);
        assert_eq!(config.shortcuts.next_patient, "Alt+S");
    }

    #[test]
    fn client_name_embeds_counter_id() {
        let config = Config {
            counter_id: 4,
            ..Config::default()
        };
        assert_eq!(config.client_name(), "Counter 4 App");
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = Config::default();
        config.counter_id = 7;
        config.notify.autocalling = false;
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
