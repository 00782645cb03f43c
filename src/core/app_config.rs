use crate::model::config::{Config, ConfigTable};
use crate::model::error::Error;
use crate::model::error::system::SystemError;
use std::env;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "./config.toml";
const CONFIG_PATH_VARIABLE: &str = "JOBSPHERE_CONFIG";
const MAX_INTERVAL_SECONDS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    config: Config,
    time_zone: chrono_tz::Tz,
}

impl AppConfig {
    /// Reads `./config.toml`, or the file named by `JOBSPHERE_CONFIG`.
    pub fn new() -> Result<Self, Error> {
        let path = env::var_os(CONFIG_PATH_VARIABLE)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let toml_string =
            fs::read_to_string(path).map_err(|err| SystemError::config_not_found(path, err))?;
        Self::from_toml(&toml_string)
    }

    pub fn from_toml(toml_string: &str) -> Result<Self, Error> {
        let config = toml::from_str::<ConfigTable>(toml_string)
            .map_err(SystemError::invalid_config)?
            .config;
        let time_zone = Self::validate(&config)?;
        Ok(AppConfig { config, time_zone })
    }

    fn validate(config: &Config) -> Result<chrono_tz::Tz, Error> {
        if config.max_concurrent_jobs == 0 {
            Err(SystemError::invalid_config_field("max_concurrent_jobs"))?
        }
        if config.default_wakeup_time == 0 || config.default_wakeup_time > MAX_INTERVAL_SECONDS {
            Err(SystemError::invalid_config_field("default_wakeup_time"))?
        }
        if config.snapshot_interval == 0 || config.snapshot_interval > MAX_INTERVAL_SECONDS {
            Err(SystemError::invalid_config_field("snapshot_interval"))?
        }
        if config.engine.program.trim().is_empty() {
            Err(SystemError::invalid_config_field("engine.program"))?
        }
        let time_zone = config
            .time_zone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| SystemError::invalid_time_zone(config.time_zone.as_str()))?;
        Ok(time_zone)
    }

    pub fn time_zone(&self) -> chrono_tz::Tz {
        self.time_zone
    }

    pub fn default_wakeup_duration(&self) -> Duration {
        Duration::from_secs(self.config.default_wakeup_time)
    }

    pub fn snapshot_duration(&self) -> Duration {
        Duration::from_secs(self.config.snapshot_interval)
    }
}

impl Deref for AppConfig {
    type Target = Config;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[Config]
max_concurrent_jobs = 2
max_retry_attempts = 3
default_wakeup_time = 600
snapshot_interval = 30
time_zone = "Europe/Berlin"
snapshot_path = "./state/snapshot.bin"
log_directory = "./logs"

[Config.engine]
program = "restic-wrapper"
arguments = ["--json"]
environment = { RESTIC_PASSWORD_FILE = "/etc/backup/password" }
"#;

    #[test]
    fn parses_sample_configuration() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.max_concurrent_jobs, 2);
        assert!(config.admit_on_enqueue);
        assert_eq!(config.time_zone(), chrono_tz::Europe::Berlin);
        assert_eq!(config.engine.arguments, vec!["--json".to_string()]);
        assert_eq!(
            config.engine.environment.get("RESTIC_PASSWORD_FILE").map(String::as_str),
            Some("/etc/backup/password")
        );
        assert_eq!(config.snapshot_duration(), Duration::from_secs(30));
    }

    #[test]
    fn time_zone_defaults_to_utc() {
        let config = AppConfig::from_toml(&SAMPLE.replace("time_zone = \"Europe/Berlin\"\n", ""))
            .unwrap();
        assert_eq!(config.time_zone(), chrono_tz::UTC);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let toml = SAMPLE.replace("max_concurrent_jobs = 2", "max_concurrent_jobs = 0");
        assert_eq!(
            AppConfig::from_toml(&toml).map(|_| ()),
            Err(SystemError::invalid_config_field("max_concurrent_jobs").into())
        );
    }

    #[test]
    fn rejects_unknown_time_zone() {
        let toml = SAMPLE.replace("Europe/Berlin", "Mars/Olympus");
        assert_eq!(
            AppConfig::from_toml(&toml).map(|_| ()),
            Err(SystemError::invalid_time_zone("Mars/Olympus").into())
        );
    }

    #[test]
    fn rejects_oversized_wakeup_time() {
        let toml = SAMPLE.replace("default_wakeup_time = 600", "default_wakeup_time = 7200");
        assert!(AppConfig::from_toml(&toml).is_err());
    }

    #[test]
    fn reads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = AppConfig::from_path(file.path()).unwrap();

        assert_eq!(config.default_wakeup_duration(), Duration::from_secs(600));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = AppConfig::from_path(Path::new("/nonexistent/config.toml"));
        assert!(matches!(
            result,
            Err(Error::System(SystemError::ConfigNotFound { .. }))
        ));
    }
}
