//! Open-Meteo elevation lookup

use std::time::Duration;

use async_trait::async_trait;
use errors::{Result, TrackerError};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::traits::ElevationApi;
use crate::DEFAULT_ELEVATION_URL;

/// Coordinates are rounded to this many decimals (about a metre) before the request
const COORDINATE_DECIMALS: i32 = 5;

fn round_coordinate(value: f64) -> f64 {
    let factor = 10f64.powi(COORDINATE_DECIMALS);
    (value * factor).round() / factor
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    url: String,
}

impl OpenMeteoClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(TrackerError::invalid_config("api.elevation_url", "must not be empty"));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Http(e.to_string()))?;
        Ok(Self { http, url })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_ELEVATION_URL, Duration::from_secs(5))
    }
}

#[async_trait]
impl ElevationApi for OpenMeteoClient {
    async fn fetch_elevation(&self, lat: f64, lng: f64) -> Result<Option<f64>> {
        let lat = round_coordinate(lat);
        let lng = round_coordinate(lng);

        let response = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("latitude", lat), ("longitude", lng)])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            warn!(
                "Elevation lookup at ({}, {}) failed with status {}",
                lat,
                lng,
                response.status().as_u16()
            );
            return Ok(None);
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to parse elevation response at ({}, {}): {}", lat, lng, e);
                return Ok(None);
            },
        };

        let elevation = body
            .get("elevation")
            .and_then(Value::as_array)
            .and_then(|values| values.first())
            .and_then(Value::as_f64);

        match elevation {
            Some(metres) => {
                debug!("Elevation at ({}, {}) is {} m", lat, lng, metres);
                Ok(Some(metres))
            },
            None => {
                warn!(
                    "Unexpected elevation response format at ({}, {}): {}",
                    lat, lng, body
                );
                Ok(None)
            },
        }
    }
}
