use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::CrawlError;

/// Runtime knobs shared by every product.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub batch_delay_min_ms: u64,
    pub batch_delay_max_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("data"),
            request_timeout_secs: 20,
            batch_delay_min_ms: 1000,
            batch_delay_max_ms: 2000,
        }
    }
}

impl Settings {
    /// Defaults, then `vietlott.toml` if present, then `VIETLOTT_*` env vars.
    pub fn load() -> Result<Self, CrawlError> {
        Self::load_from(Path::new("vietlott"))
    }

    /// `file` is a config path without extension; a missing file is fine.
    fn load_from(file: &Path) -> Result<Self, CrawlError> {
        let defaults = Settings::default();
        let settings: Settings = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())
            .and_then(|b| b.set_default("request_timeout_secs", defaults.request_timeout_secs as i64))
            .and_then(|b| b.set_default("batch_delay_min_ms", defaults.batch_delay_min_ms as i64))
            .and_then(|b| b.set_default("batch_delay_max_ms", defaults.batch_delay_max_ms as i64))
            .map_err(|e| CrawlError::Settings(e.to_string()))?
            .add_source(File::with_name(&file.to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("VIETLOTT").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CrawlError::Settings(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.request_timeout_secs == 0 {
            return Err(CrawlError::Settings(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.batch_delay_min_ms > self.batch_delay_max_ms {
            return Err(CrawlError::Settings(format!(
                "batch_delay_min_ms ({}) exceeds batch_delay_max_ms ({})",
                self.batch_delay_min_ms, self.batch_delay_max_ms
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn batch_delay(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.batch_delay_min_ms),
            Duration::from_millis(self.batch_delay_max_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.request_timeout(), Duration::from_secs(20));
        assert_eq!(
            s.batch_delay(),
            (Duration::from_millis(1000), Duration::from_millis(2000))
        );
    }

    #[test]
    fn inverted_delay_range_is_rejected() {
        let s = Settings {
            batch_delay_min_ms: 3000,
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(CrawlError::Settings(_))));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let s = Settings {
            request_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(s.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn file_then_env_layering() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("vietlott.toml"),
            "data_dir = \"out\"\nrequest_timeout_secs = 30\nbatch_delay_max_ms = 5000\n",
        )
        .unwrap();

        std::env::set_var("VIETLOTT_REQUEST_TIMEOUT_SECS", "7");
        let loaded = Settings::load_from(&dir.path().join("vietlott"));
        std::env::remove_var("VIETLOTT_REQUEST_TIMEOUT_SECS");

        let s = loaded.unwrap();
        assert_eq!(s.request_timeout(), Duration::from_secs(7));
        assert_eq!(s.data_dir, PathBuf::from("out"));
        assert_eq!(
            s.batch_delay(),
            (Duration::from_millis(1000), Duration::from_millis(5000))
        );
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load_from(&dir.path().join("absent")).unwrap();
        assert_eq!(s.data_dir, PathBuf::from("data"));
        assert_eq!(s.batch_delay_max_ms, 2000);
    }
}
