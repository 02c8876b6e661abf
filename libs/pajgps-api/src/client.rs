//! PAJ GPS API client
//!
//! One attempt per call with a per-request timeout. The bearer token is
//! cached and reused until its TTL runs out.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use errors::{Result, TrackerError};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::alert::AlertType;
use crate::models::{
    parse_devices, parse_notifications, parse_positions, success_field, Device, DeviceId,
    Notification, PositionPayload,
};
use crate::traits::TrackerApi;
use crate::{BODY_PREVIEW_LEN, DEFAULT_API_URL};

/// Client configuration
#[derive(Debug, Clone)]
pub struct PajGpsClientConfig {
    pub base_url: String,
    pub email: String,
    pub password: String,
    pub request_timeout: Duration,
    pub token_ttl: Duration,
}

impl PajGpsClientConfig {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            email: email.into(),
            password: password.into(),
            request_timeout: Duration::from_secs(5),
            token_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    obtained_at: Instant,
}

/// HTTP client for the tracker cloud
pub struct PajGpsClient {
    http: Client,
    base_url: Url,
    email: String,
    password: String,
    token_ttl: Duration,
    token: RwLock<Option<CachedToken>>,
}

impl std::fmt::Debug for PajGpsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PajGpsClient")
            .field("base_url", &self.base_url.as_str())
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl PajGpsClient {
    /// Create a new client
    pub fn new(config: PajGpsClientConfig) -> Result<Self> {
        let mut base = config.base_url.trim().to_string();
        if base.is_empty() {
            return Err(TrackerError::invalid_config("api.base_url", "must not be empty"));
        }
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| TrackerError::invalid_config("api.base_url", e.to_string()))?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TrackerError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            email: config.email,
            password: config.password,
            token_ttl: config.token_ttl,
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| TrackerError::config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// Current token, logging in first when none is cached or it expired
    async fn bearer(&self) -> Result<String> {
        if let Some(token) = self.valid_token().await {
            return Ok(token);
        }
        self.login(false).await?;
        self.valid_token()
            .await
            .ok_or_else(|| TrackerError::Auth("No token after login".to_string()))
    }

    async fn valid_token(&self) -> Option<String> {
        let guard = self.token.read().await;
        guard
            .as_ref()
            .filter(|t| t.obtained_at.elapsed() < self.token_ttl)
            .map(|t| t.value.clone())
    }

    fn with_standard_headers(builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(reqwest::header::ACCEPT, "application/json")
            .header("X-CSRF-TOKEN", "")
    }

    /// Authenticated request returning the parsed JSON body
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value> {
        let token = self.bearer().await?;
        let url = self.endpoint(path)?;

        let mut request = Self::with_standard_headers(self.http.request(method.clone(), url.clone()))
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        debug!("{} {}", method, url.path());
        let response = request.send().await?;
        handle_response(response).await
    }
}

fn preview(text: &str) -> String {
    text.chars().take(BODY_PREVIEW_LEN).collect()
}

/// Map an HTTP response onto the error taxonomy
///
/// 200 must carry JSON. An error status with a JSON `error` member becomes
/// `Api` (or `Auth` for 401/403); anything else becomes `Api` with a short
/// body preview.
pub(crate) async fn handle_response(response: Response) -> Result<Value> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    if status == StatusCode::OK {
        return serde_json::from_str(&text).map_err(|e| {
            TrackerError::payload(format!(
                "Expected JSON from {} ({}): {}",
                url,
                e,
                preview(&text)
            ))
        });
    }

    let message = match serde_json::from_str::<Value>(&text) {
        Ok(body) if body.get("error").is_some_and(|e| !e.is_null()) => match &body["error"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        _ => {
            warn!(
                "Non-JSON error response from {}: status {}, body preview: {}",
                url,
                status.as_u16(),
                preview(&text)
            );
            format!("HTTP {} from {}: {}", status.as_u16(), url, preview(&text))
        },
    };

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(TrackerError::Auth(message));
    }
    Err(TrackerError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl TrackerApi for PajGpsClient {
    async fn login(&self, force: bool) -> Result<()> {
        if !force && self.valid_token().await.is_some() {
            debug!("Token refresh skipped (still valid)");
            return Ok(());
        }

        let url = self.endpoint("login")?;
        let response = Self::with_standard_headers(self.http.post(url))
            .query(&[("email", self.email.as_str()), ("password", self.password.as_str())])
            .send()
            .await?;

        let body = match handle_response(response).await {
            Ok(body) => body,
            Err(TrackerError::Api { status, message }) => {
                error!("Login rejected (status {}): {}", status, message);
                return Err(TrackerError::Auth(message));
            },
            Err(e) => return Err(e),
        };

        let token = success_field(body, "login")?
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| TrackerError::Auth("Login response did not contain a token".to_string()))?;

        *self.token.write().await = Some(CachedToken {
            value: token,
            obtained_at: Instant::now(),
        });
        debug!("Token refreshed successfully");
        Ok(())
    }

    async fn get_devices(&self) -> Result<Vec<Device>> {
        let body = self.send(Method::GET, "device", &[], None).await?;
        parse_devices(body)
    }

    async fn get_all_last_positions(&self, device_ids: &[DeviceId]) -> Result<Vec<PositionPayload>> {
        let payload = json!({ "deviceIDs": device_ids, "fromLastPoint": false });
        let body = self
            .send(
                Method::POST,
                "trackerdata/getalllastpositions",
                &[],
                Some(payload),
            )
            .await?;
        parse_positions(body)
    }

    async fn get_unread_notifications(&self) -> Result<Vec<Notification>> {
        let body = self
            .send(
                Method::GET,
                "notifications",
                &[("isRead", "0".to_string())],
                None,
            )
            .await?;
        parse_notifications(body)
    }

    async fn mark_notifications_read(&self, alert_type: u8) -> Result<()> {
        self.send(
            Method::PUT,
            "notifications/markReadByCustomer",
            &[
                ("alertType", alert_type.to_string()),
                ("isRead", "1".to_string()),
            ],
            None,
        )
        .await?;
        debug!("Alert type {} marked as read", alert_type);
        Ok(())
    }

    async fn update_device_flag(
        &self,
        device_id: DeviceId,
        alert: AlertType,
        enabled: bool,
    ) -> Result<()> {
        let value = if enabled { "1" } else { "0" };
        self.send(
            Method::PUT,
            &format!("device/{}", device_id),
            &[(alert.update_field(), value.to_string())],
            None,
        )
        .await?;
        debug!(
            "Alert {} for device {} set to {}",
            alert.update_field(),
            device_id,
            value
        );
        Ok(())
    }

    async fn check_availability(&self) -> bool {
        let root = match self.base_url.join("/") {
            Ok(url) => url,
            Err(e) => {
                error!("Cannot derive API host from {}: {}", self.base_url, e);
                return false;
            },
        };

        match self.http.head(root).send().await {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                warn!(
                    "API URL is not reachable (status {})",
                    response.status().as_u16()
                );
                false
            },
            Err(e) if e.is_timeout() => {
                warn!("Timeout while checking API URL");
                false
            },
            Err(e) => {
                error!("Error while checking API availability: {}", e);
                false
            },
        }
    }
}
