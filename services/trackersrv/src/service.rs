//! Host loop pieces: wiring, one poll cycle, entity state export

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use errors::Result;
use pajgps_api::{DeviceId, ElevationApi, OpenMeteoClient, PajGpsClient, TrackerApi};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{Config, OptionsConfig};
use crate::coordinator::{Coordinator, CoordinatorSettings};
use crate::entities::{build_entities, Entity, EntityKind, EntityState};

/// Exported view of one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub unique_id: String,
    pub name: String,
    pub device_id: DeviceId,
    pub kind: EntityKind,
    pub state: EntityState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
}

impl EntitySnapshot {
    fn of(entity: &dyn Entity) -> Self {
        Self {
            unique_id: entity.unique_id().to_string(),
            name: entity.name().to_string(),
            device_id: entity.device_id(),
            kind: entity.kind(),
            state: entity.state(),
            unit: entity.unit(),
            icon: entity.icon(),
        }
    }
}

pub struct TrackerService {
    coordinator: Arc<Coordinator>,
    options: OptionsConfig,
    entities: Vec<Box<dyn Entity>>,
    last_states: HashMap<String, EntityState>,
}

impl TrackerService {
    /// Wire the real HTTP clients from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let api: Arc<dyn TrackerApi> = Arc::new(PajGpsClient::new(config.client_config())?);
        let elevation_api: Option<Arc<dyn ElevationApi>> = if config.options.fetch_elevation {
            Some(Arc::new(OpenMeteoClient::new(
                config.api.elevation_url.clone(),
                config.api.request_timeout,
            )?))
        } else {
            None
        };

        let settings = CoordinatorSettings {
            guid: config.service.guid.clone(),
            intervals: config.intervals,
            mark_alerts_as_read: config.options.mark_alerts_as_read,
            fetch_elevation: config.options.fetch_elevation,
        };
        Ok(Self::new(
            Arc::new(Coordinator::new(api, elevation_api, settings)),
            config.options,
        ))
    }

    pub fn new(coordinator: Arc<Coordinator>, options: OptionsConfig) -> Self {
        Self {
            coordinator,
            options,
            entities: Vec::new(),
            last_states: HashMap::new(),
        }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// First tick, then entity creation from the fetched device list
    pub async fn start(&mut self) -> Result<()> {
        self.coordinator.tick().await?;
        self.entities = build_entities(&self.coordinator, &self.options);
        self.update_entities().await;
        Ok(())
    }

    /// One poll cycle: coordinator tick, then every entity in turn
    pub async fn poll(&mut self) {
        if let Err(e) = self.coordinator.tick().await {
            if e.log_level() == tracing::Level::ERROR {
                error!(code = e.error_code(), "Coordinator update failed: {}", e);
            } else {
                warn!(code = e.error_code(), "Coordinator update failed: {}", e);
            }
        }
        if self.entities.is_empty() && !self.coordinator.data().devices.is_empty() {
            info!("Devices became available, creating entities");
            self.entities = build_entities(&self.coordinator, &self.options);
        }
        self.update_entities().await;
    }

    async fn update_entities(&mut self) {
        for entity in self.entities.iter_mut() {
            entity.update().await;

            let state = entity.state();
            let changed = self.last_states.get(entity.unique_id()) != Some(&state);
            if changed {
                debug!("{} -> {:?}", entity.unique_id(), state);
                self.last_states.insert(entity.unique_id().to_string(), state);
            }
        }
    }

    pub fn entities(&self) -> &[Box<dyn Entity>] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Box<dyn Entity>] {
        &mut self.entities
    }

    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        self.entities.iter().map(|e| EntitySnapshot::of(e.as_ref())).collect()
    }

    /// Run poll cycles at `period` until `stop` resolves
    pub async fn run_until<F>(&mut self, period: Duration, stop: F)
    where
        F: std::future::Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the first tick completes immediately and `start` already polled
        interval.tick().await;

        tokio::pin!(stop);
        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = interval.tick() => self.poll().await,
            }
        }
    }

    /// Warn early when the API host is unreachable
    pub async fn check_availability(&self) -> bool {
        let available = self.coordinator.api().check_availability().await;
        if !available {
            warn!("PAJ GPS API is not reachable, updates will fail until it is");
        }
        available
    }

    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }
}
