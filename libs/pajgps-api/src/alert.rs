//! Alert kinds known to the tracker API
//!
//! Notifications carry a numeric `meldungtyp`. Eight of those kinds can be
//! toggled per device; the rest (radius, geofence enter/leave, turn-off) only
//! ever show up as notifications.

use std::fmt;

use errors::TrackerError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Shock,
    Battery,
    Sos,
    Speed,
    PowerCutoff,
    Ignition,
    Drop,
    Voltage,
}

impl AlertType {
    /// Every toggleable alert kind, in code order
    pub const ALL: [AlertType; 8] = [
        AlertType::Shock,
        AlertType::Battery,
        AlertType::Sos,
        AlertType::Speed,
        AlertType::PowerCutoff,
        AlertType::Ignition,
        AlertType::Drop,
        AlertType::Voltage,
    ];

    /// Numeric `meldungtyp` / `alertType` code
    pub fn code(self) -> u8 {
        match self {
            AlertType::Shock => 1,
            AlertType::Battery => 2,
            AlertType::Sos => 4,
            AlertType::Speed => 5,
            AlertType::PowerCutoff => 6,
            AlertType::Ignition => 7,
            AlertType::Drop => 9,
            AlertType::Voltage => 13,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            AlertType::Shock => "Shock Alert",
            AlertType::Battery => "Battery Alert",
            AlertType::Sos => "SOS Alert",
            AlertType::Speed => "Speed Alert",
            AlertType::PowerCutoff => "Power Cut-off Alert",
            AlertType::Ignition => "Ignition Alert",
            AlertType::Drop => "Drop Alert",
            AlertType::Voltage => "Voltage Alert",
        }
    }

    /// Capability field in `device_models[0]`
    pub fn model_field(self) -> &'static str {
        match self {
            AlertType::Shock => "alarm_erschuetterung",
            AlertType::Battery => "alarm_batteriestand",
            AlertType::Sos => "alarm_sos",
            AlertType::Speed => "alarm_geschwindigkeit",
            AlertType::PowerCutoff => "alarm_stromunterbrechung",
            AlertType::Ignition => "alarm_zuendalarm",
            AlertType::Drop => "alarm_drop",
            AlertType::Voltage => "alarm_volt",
        }
    }

    /// Query parameter used by `PUT device/{id}`
    ///
    /// Differs from the field the device list reports for `Drop`
    /// (`alarm_fall` vs `alarm_fall_enabled`).
    pub fn update_field(self) -> &'static str {
        match self {
            AlertType::Shock => "alarmbewegung",
            AlertType::Battery => "alarmakkuwarnung",
            AlertType::Sos => "alarmsos",
            AlertType::Speed => "alarmgeschwindigkeit",
            AlertType::PowerCutoff => "alarmstromunterbrechung",
            AlertType::Ignition => "alarmzuendalarm",
            AlertType::Drop => "alarm_fall",
            AlertType::Voltage => "alarm_volt",
        }
    }

    /// Suffix used in entity unique ids
    pub fn slug(self) -> &'static str {
        match self {
            AlertType::Shock => "shock",
            AlertType::Battery => "battery",
            AlertType::Sos => "sos",
            AlertType::Speed => "speed",
            AlertType::PowerCutoff => "power_cutoff",
            AlertType::Ignition => "ignition",
            AlertType::Drop => "drop",
            AlertType::Voltage => "voltage",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for AlertType {
    type Error = TrackerError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(TrackerError::UnknownAlertType(code))
    }
}

/// Display name for any notification code, toggleable or not
pub fn alert_display_name(code: u8) -> Option<&'static str> {
    if let Some(alert) = AlertType::from_code(code) {
        return Some(alert.name());
    }
    match code {
        3 => Some("Radius Alert"),
        10 => Some("Area Enter Alert"),
        11 => Some("Area Leave Alert"),
        22 => Some("Turn off Alert"),
        _ => None,
    }
}
