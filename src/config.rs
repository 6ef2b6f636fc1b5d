use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::pipe::{Error, Result};
use crate::util::home_path;

const CONFIG_FILE: &str = ".maestro.conf";
const DEFAULT_PEAK_LEVEL: f64 = -1.0;

#[derive(Serialize, Deserialize)]
pub struct Config {
    // Override the pipe Audacity reads commands from
    pub to_pipe: Option<String>,
    // Override the pipe Audacity writes replies to
    pub from_pipe: Option<String>,
    // Give up waiting for a reply after this many seconds.
    // Unset or 0 waits forever.
    pub timeout_secs: Option<u64>,
    // Target peak level in dB for the normalize workflow
    #[serde(default = "default_peak_level")]
    pub peak_level: f64,
}

fn default_peak_level() -> f64 {
    DEFAULT_PEAK_LEVEL
}

impl Config {
    pub fn new() -> Self {
        Config {
            to_pipe: None,
            from_pipe: None,
            timeout_secs: None,
            peak_level: DEFAULT_PEAK_LEVEL,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            None | Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }
}

pub fn load() -> Result<Config> {
    load_from(&home_path(CONFIG_FILE))
}

fn load_from(path: &Path) -> Result<Config> {
    // Create the config file if it doesn't already exist
    if !path.exists() {
        let default = Config::new();
        save_to(&default, path)?;
        return Ok(default);
    }

    let file = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&file)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    Ok(config)
}

fn save_to(config: &Config, path: &Path) -> Result<()> {
    let serialized = toml::to_string(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, serialized)?;
    Ok(())
}
