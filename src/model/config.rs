use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct ConfigTable {
    #[serde(rename = "Config")]
    pub config: Config,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub max_concurrent_jobs: usize, // number
    pub max_retry_attempts: u32,    // number
    #[serde(default = "default_admit_on_enqueue")]
    pub admit_on_enqueue: bool,
    pub default_wakeup_time: u64, // second
    pub snapshot_interval: u64,   // second
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    pub snapshot_path: PathBuf,
    pub log_directory: PathBuf,
    pub engine: EngineConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EngineConfig {
    pub program: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

fn default_admit_on_enqueue() -> bool {
    true
}

fn default_time_zone() -> String {
    "UTC".to_string()
}
