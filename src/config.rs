//! Game configuration stored as TOML under the user's config directory
//!
//! ```toml
//! [classifier]
//! trigger_threshold = 0.785
//! neutral_threshold = 0.2
//! max_resting_tilt = 0.6
//!
//! [round]
//! game_duration = 60.0
//! ...
//! ```
//!
//! Every section and key is optional; anything missing takes its default.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::feedback::FeedbackSettings;
use crate::game::models::RoundConfiguration;
use crate::motion::classifier::ClassifierSettings;
use crate::motion::scripted_source::{SourceSettings, MAX_SAMPLE_RATE_HZ};

const CONFIG_DIR: &str = ".config/tiltdeck";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub classifier: ClassifierSettings,
    pub round: RoundConfiguration,
    pub feedback: FeedbackSettings,
    pub sensor: SourceSettings,
}

impl GameConfig {
    /// `~/.config/tiltdeck/config.toml`
    pub fn config_path() -> PathBuf {
        let mut path = get_home_dir();
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    /// Writes the defaults unless a config file already exists
    pub async fn ensure_default_config() -> Result<()> {
        let path = Self::config_path();
        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            debug!("Config file present at {}", path.display());
            return Ok(());
        }

        info!("Writing default config to {}", path.display());
        GameConfig::default().save_to(&path).await
    }

    pub async fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()).await
    }

    /// Reads and validates `path`, falling back to the defaults when it does
    /// not exist
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            warn!("Config file {} does not exist, using default", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file: {}", e))?;

        let config: GameConfig =
            toml::from_str(&content).map_err(|e| eyre!("Failed to parse config file: {}", e))?;
        config
            .validate()
            .map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))?;
        debug!("Loaded config: {:?}", config);
        Ok(config)
    }

    /// Rejects values the round and sensor timers cannot run with
    pub fn validate(&self) -> Result<()> {
        let classifier = &self.classifier;
        ensure_positive("classifier.trigger_threshold", classifier.trigger_threshold)?;
        ensure_non_negative("classifier.neutral_threshold", classifier.neutral_threshold)?;
        ensure_positive("classifier.max_resting_tilt", classifier.max_resting_tilt)?;

        let round = &self.round;
        ensure_non_negative("round.buffer_duration", round.buffer_duration)?;
        ensure_positive("round.game_duration", round.game_duration)?;
        ensure_non_negative("round.warning_threshold", round.warning_threshold)?;
        ensure_positive("round.tick_interval", round.tick_interval)?;
        ensure_non_negative("round.settle_delay", round.settle_delay)?;

        ensure_positive("sensor.sample_rate_hz", self.sensor.sample_rate_hz)?;
        if self.sensor.sample_rate_hz > MAX_SAMPLE_RATE_HZ {
            return Err(eyre!(
                "sensor.sample_rate_hz = {} exceeds {} Hz",
                self.sensor.sample_rate_hz,
                MAX_SAMPLE_RATE_HZ
            ));
        }

        Ok(())
    }

    pub async fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()).await
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file: {}", e))?;

        info!("Config saved to {}", path.display());
        Ok(())
    }
}

fn ensure_positive(key: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(eyre!("{} = {} must be a finite number above 0", key, value))
    }
}

fn ensure_non_negative(key: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(eyre!("{} = {} must be a finite number of at least 0", key, value))
    }
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn scratch_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "tiltdeck-{}-{}-{}",
            name,
            std::process::id(),
            Local::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        path.push(CONFIG_FILE);
        path
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: GameConfig = toml::from_str(
            r#"
            [round]
            game_duration = 90.0

            [feedback]
            sound_enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.round.game_duration, 90.0);
        assert_eq!(config.round.warning_threshold, 10.0);
        assert!(!config.feedback.sound_enabled);
        assert!(config.feedback.haptics_enabled);
        assert_eq!(config.classifier, ClassifierSettings::default());
    }

    #[test]
    fn empty_toml_is_default() {
        let config: GameConfig = toml::from_str("").unwrap();
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn rejects_wrong_types() {
        let parsed = toml::from_str::<GameConfig>("[round]\ngame_duration = \"long\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn validation_rejects_unusable_timings() {
        let infinite_settle: GameConfig =
            toml::from_str("[round]\nsettle_delay = inf\n").unwrap();
        let err = infinite_settle.validate().unwrap_err();
        assert!(err.to_string().contains("round.settle_delay"));

        let nan_warning: GameConfig =
            toml::from_str("[round]\nwarning_threshold = nan\n").unwrap();
        assert!(nan_warning.validate().is_err());

        let zero_tick: GameConfig = toml::from_str("[round]\ntick_interval = 0.0\n").unwrap();
        assert!(zero_tick.validate().is_err());

        let fast_sensor: GameConfig = toml::from_str("[sensor]\nsample_rate_hz = 1e12\n").unwrap();
        let err = fast_sensor.validate().unwrap_err();
        assert!(err.to_string().contains("sensor.sample_rate_hz"));
    }

    #[tokio::test]
    async fn invalid_file_fails_to_load() {
        let path = scratch_path("invalid");
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.unwrap();
        }
        tokio::fs::write(&path, "[round]\nsettle_delay = inf\n")
            .await
            .unwrap();

        let loaded = GameConfig::load_from(&path).await;

        assert!(loaded.is_err());
        if let Some(dir) = path.parent() {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let path = scratch_path("missing");

        let config = GameConfig::load_from(&path).await.unwrap();

        assert_eq!(config, GameConfig::default());
    }

    #[tokio::test]
    async fn saved_config_loads_back() {
        let path = scratch_path("saved");
        let mut config = GameConfig::default();
        config.round.game_duration = 45.0;
        config.classifier.trigger_threshold = 0.9;
        config.sensor.sample_rate_hz = 30.0;

        config.save_to(&path).await.unwrap();
        let loaded = GameConfig::load_from(&path).await.unwrap();

        assert_eq!(loaded, config);
        if let Some(dir) = path.parent() {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }
    }
}
