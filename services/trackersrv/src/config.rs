//! trackersrv configuration
//!
//! Loaded from `config/trackersrv.yaml` and `TRACKERSRV_*` environment
//! variables (`__` separates nesting, e.g. `TRACKERSRV_ACCOUNT__PASSWORD`).

use std::path::Path;
use std::time::Duration;

use common::LogConfig;
use errors::{Result, TrackerError};
use pajgps_api::{PajGpsClientConfig, DEFAULT_API_URL, DEFAULT_ELEVATION_URL};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "TRACKERSRV_";
pub const DEFAULT_CONFIG_PATH: &str = "config/trackersrv.yaml";

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub account: AccountConfig,
    pub api: ApiConfig,
    pub intervals: IntervalConfig,
    pub options: OptionsConfig,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    /// Stable identifier of this integration instance, part of every entity id
    pub guid: String,
    /// Display name of the account entry
    pub entry_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "trackersrv".to_string(),
            guid: "default".to_string(),
            entry_name: "PAJ GPS".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub elevation_url: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            elevation_url: DEFAULT_ELEVATION_URL.to_string(),
            request_timeout: Duration::from_secs(5),
            token_ttl: Duration::from_secs(300),
        }
    }
}

/// How often each update tier runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    #[serde(with = "humantime_serde")]
    pub devices: Duration,
    #[serde(with = "humantime_serde")]
    pub positions: Duration,
    #[serde(with = "humantime_serde")]
    pub notifications: Duration,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            devices: Duration::from_secs(300),
            positions: Duration::from_secs(30),
            notifications: Duration::from_secs(10),
        }
    }
}

impl IntervalConfig {
    /// Host loop period: the fastest tier
    pub fn fastest(&self) -> Duration {
        self.devices.min(self.positions).min(self.notifications)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub mark_alerts_as_read: bool,
    pub fetch_elevation: bool,
    /// Create a battery sensor even when the model reports no standalone battery
    pub force_battery: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            mark_alerts_as_read: true,
            fetch_elevation: false,
            force_battery: false,
        }
    }
}

impl Config {
    /// Load from file + environment and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = common::load_config(path, ENV_PREFIX)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.name.trim().is_empty() {
            return Err(TrackerError::invalid_config("service.name", "cannot be empty"));
        }
        if self.service.guid.trim().is_empty() {
            return Err(TrackerError::invalid_config("service.guid", "cannot be empty"));
        }
        if self.account.email.trim().is_empty() {
            return Err(TrackerError::invalid_config("account.email", "cannot be empty"));
        }
        if !is_valid_email(&self.account.email) {
            return Err(TrackerError::invalid_config(
                "account.email",
                format!("'{}' is not an email address", self.account.email),
            ));
        }
        if self.account.password.is_empty() {
            return Err(TrackerError::invalid_config("account.password", "cannot be empty"));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(TrackerError::invalid_config("api.base_url", "cannot be empty"));
        }
        if self.api.request_timeout.is_zero() {
            return Err(TrackerError::invalid_config("api.request_timeout", "must be positive"));
        }

        for (field, interval) in [
            ("intervals.devices", self.intervals.devices),
            ("intervals.positions", self.intervals.positions),
            ("intervals.notifications", self.intervals.notifications),
        ] {
            if interval.is_zero() {
                return Err(TrackerError::invalid_config(field, "must be positive"));
            }
        }

        Ok(())
    }

    pub fn client_config(&self) -> PajGpsClientConfig {
        PajGpsClientConfig {
            base_url: self.api.base_url.clone(),
            email: self.account.email.clone(),
            password: self.account.password.clone(),
            request_timeout: self.api.request_timeout,
            token_ttl: self.api.token_ttl,
        }
    }
}

/// `local@domain.tld`, no whitespace
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
