use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api_connection::endpoints::{DEFAULT_MODEL, OPENAI_BASE_URL};
use crate::schedule::{ClockTime, TimeWindow, DEFAULT_SNAP_MINUTES};

/// Environment variable holding the chat API key.
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_window_start")]
    pub window_start: ClockTime,
    #[serde(default = "default_window_end")]
    pub window_end: ClockTime,
    #[serde(default = "default_snap_minutes")]
    pub snap_minutes: u32,
    /// Pointer travel (px) before a press counts as a drag.
    #[serde(default = "default_drag_threshold_px")]
    pub drag_threshold_px: f64,
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,
    #[serde(default = "default_notice_lifetime_secs")]
    pub notice_lifetime_secs: u64,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_api_key_env_var")]
    pub api_key_env_var: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

fn default_window_start() -> ClockTime {
    TimeWindow::default().start()
}

fn default_window_end() -> ClockTime {
    TimeWindow::default().end()
}

fn default_snap_minutes() -> u32 {
    DEFAULT_SNAP_MINUTES
}

fn default_drag_threshold_px() -> f64 {
    5.0
}

fn default_autosave_debounce_ms() -> u64 {
    1000
}

fn default_notice_lifetime_secs() -> u64 {
    5
}

fn default_api_base_url() -> String {
    OPENAI_BASE_URL.to_string()
}

fn default_api_key_env_var() -> String {
    API_KEY_ENV_VAR.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window_start: default_window_start(),
            window_end: default_window_end(),
            snap_minutes: default_snap_minutes(),
            drag_threshold_px: default_drag_threshold_px(),
            autosave_debounce_ms: default_autosave_debounce_ms(),
            notice_lifetime_secs: default_notice_lifetime_secs(),
            api_base_url: default_api_base_url(),
            api_key_env_var: default_api_key_env_var(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            store_dir: None,
        }
    }
}

impl SchedulerConfig {
    /// Read the config from `path` if given and present, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();
        let config = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path).context("Failed to read config file")?;
                serde_json::from_str::<SchedulerConfig>(&contents).context("Failed to parse config file")?
            }
            _ => SchedulerConfig::default(),
        };
        config.check()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn check(&self) -> Result<()> {
        self.window().context("Invalid schedule window in config")?;
        if self.autosave_debounce_ms == 0 {
            bail!("autosave_debounce_ms must be greater than zero");
        }
        if self.drag_threshold_px < 0.0 {
            bail!("drag_threshold_px must not be negative");
        }
        Ok(())
    }

    pub fn window(&self) -> Result<TimeWindow> {
        Ok(TimeWindow::new(self.window_start, self.window_end)?)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn notice_lifetime(&self) -> Duration {
        Duration::from_secs(self.notice_lifetime_secs)
    }

    /// Where schedule records live: the configured directory, or the
    /// platform data directory.
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.store_dir {
            return Ok(dir.clone());
        }
        let proj_dirs = ProjectDirs::from("com", "prep-schedule", "prep_schedule")
            .context("Could not determine data directory")?;
        Ok(proj_dirs.data_dir().join("schedules"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let config = SchedulerConfig::load(Some(Path::new("no_such_prep_schedule_config.json")))?;
        assert_eq!(config.window()?, TimeWindow::default());
        assert_eq!(config.snap_minutes, 15);
        assert_eq!(config.autosave_debounce(), Duration::from_secs(1));
        assert_eq!(config.api_key_env_var, API_KEY_ENV_VAR);
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"window_start":"07:00","window_end":"15:30","snap_minutes":5}}"#)?;
        file.flush()?;
        let config = SchedulerConfig::load(Some(file.path()))?;
        assert_eq!(config.window()?, TimeWindow::parse("07:00", "15:30").unwrap());
        assert_eq!(config.snap_minutes, 5);
        assert_eq!(config.model, "gpt-4o-mini");
        Ok(())
    }

    #[test]
    fn test_inverted_window_rejected() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"window_start":"18:00","window_end":"06:00"}}"#)?;
        file.flush()?;
        let err = SchedulerConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Invalid schedule window"));
        Ok(())
    }

    #[test]
    fn test_zero_debounce_rejected() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"autosave_debounce_ms":0}}"#)?;
        file.flush()?;
        assert!(SchedulerConfig::load(Some(file.path())).is_err());
        Ok(())
    }

    #[test]
    fn test_save_then_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("config.json");
        let mut config = SchedulerConfig::default();
        config.store_dir = Some(dir.path().to_path_buf());
        config.save(&path)?;
        let loaded = SchedulerConfig::load(Some(&path))?;
        assert_eq!(loaded.store_dir()?, dir.path().to_path_buf());
        Ok(())
    }
}
