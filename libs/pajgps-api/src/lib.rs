//! PAJ GPS cloud API client
//!
//! Thin async wrappers around the tracker endpoints (login, devices, last
//! positions, notifications, alert toggles) plus the Open-Meteo elevation
//! lookup used to enrich positions.

pub mod alert;
pub mod client;
pub mod elevation;
pub mod models;
pub mod serde_helpers;
pub mod traits;

pub use alert::{alert_display_name, AlertType};
pub use client::{PajGpsClient, PajGpsClientConfig};
pub use elevation::OpenMeteoClient;
pub use models::{Device, DeviceId, Notification, PositionPayload};
pub use traits::{ElevationApi, TrackerApi};

/// Default PAJ GPS API root
pub const DEFAULT_API_URL: &str = "https://connect.paj-gps.de/api/v1/";

/// Default Open-Meteo elevation endpoint
pub const DEFAULT_ELEVATION_URL: &str = "https://api.open-meteo.com/v1/elevation";

/// Longest response body excerpt carried in error messages
pub const BODY_PREVIEW_LEN: usize = 200;
