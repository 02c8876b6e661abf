//! Layered configuration loading
//!
//! Priority (highest to lowest):
//! 1. Environment variables (prefixed, `__` separates nesting levels)
//! 2. Configuration file (format chosen by extension)
//! 3. `T::default()`

use std::path::Path;

use errors::{config_error, Result, TrackerError};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Load configuration from defaults, an optional file and the environment
///
/// A missing file is tolerated so a service can run from defaults and
/// environment variables alone.
pub fn load_config<T, P>(path: P, env_prefix: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Serialize + Default,
    P: AsRef<Path>,
{
    let figment = Figment::from(Serialized::defaults(T::default()));
    let figment = merge_file(figment, path.as_ref())?;

    figment
        .merge(Env::prefixed(env_prefix).split("__"))
        .extract()
        .map_err(|e| TrackerError::config(format!("Failed to load configuration: {}", e)))
}

/// Load configuration from a specific file, without defaults or environment
pub fn load_config_from_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(TrackerError::config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    merge_file(Figment::new(), path)?
        .extract()
        .map_err(|e| TrackerError::config(format!("Failed to load configuration from file: {}", e)))
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| config_error!("Config file must have an extension"))?;

    match extension {
        "toml" => Ok(figment.merge(Toml::file(path))),
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        "json" => Ok(figment.merge(Json::file(path))),
        _ => Err(config_error!("Unsupported config file format: {}", extension)),
    }
}
