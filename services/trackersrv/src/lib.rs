//! trackersrv - PAJ GPS tracker bridge
//!
//! Polls the PAJ GPS cloud for devices, positions and alerts and exposes them
//! as entities: voltage, battery, speed and elevation sensors, a location
//! tracker, alert binary sensors and alert switches.

pub mod config;
pub mod coordinator;
pub mod entities;
pub mod service;
pub mod store;
pub mod voltage;

pub const SERVICE_NAME: &str = "trackersrv";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::Config;
pub use coordinator::{Coordinator, CoordinatorData, CoordinatorSettings, DeviceInfo, PositionSource};
pub use entities::{build_entities, Entity, EntityKind, EntityState};
pub use service::{EntitySnapshot, TrackerService};
pub use store::{PositionRecord, PositionStore};
pub use voltage::{normalize, AbsentReason, Voltage, MILLIVOLT_THRESHOLD};
