//! Analytics event client
//!
//! Events are fire-and-forget: they run on detached tasks and their
//! failures are logged, never returned to the request that caused them.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::errors::SiteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The index page was requested
    Ping,
    /// A new version was deployed
    Deploy,
}

/// Request details attached to an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestInfo {
    pub host: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl RequestInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            host: get(header::HOST),
            user_agent: get(header::USER_AGENT),
            referer: get(header::REFERER),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsEvent {
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub request: RequestInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<usize>,
}

impl AnalyticsEvent {
    pub fn ping(request: RequestInfo) -> Self {
        Self {
            event: EventKind::Ping,
            timestamp: Utc::now(),
            request,
            deployment_id: None,
            files: None,
        }
    }

    pub fn deploy(request: RequestInfo, deployment_id: Uuid, files: usize) -> Self {
        Self {
            event: EventKind::Deploy,
            timestamp: Utc::now(),
            request,
            deployment_id: Some(deployment_id),
            files: Some(files),
        }
    }
}

/// HTTP client for the analytics collector
pub struct AnalyticsClient {
    client: Client,
    endpoint: Option<Url>,
}

impl AnalyticsClient {
    /// Create a client. Without an endpoint every event is dropped.
    pub fn new(endpoint: Option<Url>) -> Result<Self, SiteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, endpoint })
    }

    /// A client that never sends anything
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            endpoint: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// POST the event as JSON
    pub async fn send(&self, event: &AnalyticsEvent) -> Result<(), SiteError> {
        let Some(endpoint) = &self.endpoint else {
            debug!("Analytics disabled, dropping {:?} event", event.event);
            return Ok(());
        };

        let response = self
            .client
            .post(endpoint.clone())
            .json(event)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SiteError::ServerError(format!(
                "analytics collector returned {}: {}",
                status, body
            )));
        }

        debug!("Sent {:?} analytics event", event.event);
        Ok(())
    }

    /// Send `event` on a detached task after `delay`
    pub fn send_later(self: &Arc<Self>, event: AnalyticsEvent, delay: Duration) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Err(e) = client.send(&event).await {
                warn!("Failed to send {:?} analytics event: {}", event.event, e);
            }
        })
    }
}
