//! HTTP request handlers

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analytics::client::{AnalyticsEvent, RequestInfo};
use crate::deploy::disc_space::has_enough_space;
use crate::errors::SiteError;
use crate::secret::store::KeyReloadPolicy;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Header carrying the deployment secret
pub const DEPLOYMENT_KEY_HEADER: &str = "deployment_key";
/// Optional header with the expected archive size in bytes
pub const ZIP_LENGTH_HEADER: &str = "zip_length";

pub const DEPLOY_SUCCESS: &str = "Successfully deployed new version";
pub const INSUFFICIENT_SPACE: &str = "Your instance does not have enough free disc space left";

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "sitedeploy".to_string(),
        version: version.version,
    })
}

/// Serves `index.html` from the output directory and records a ping
pub async fn index_handler(State(state): State<Arc<ServerState>>, request: Request) -> Response {
    if state.analytics.is_enabled() {
        let info = RequestInfo::from_headers(request.headers());
        state
            .analytics
            .send_later(AnalyticsEvent::ping(info), Duration::ZERO);
    }

    let index = state.deployer.layout().public_dir().file("index.html");
    let service = ServeFile::new(index.path())
        .precompressed_gzip()
        .precompressed_br();
    match service.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// The leading decimal digits of `value`, e.g. `100` for `100abc`
fn leading_number(value: &str) -> Option<u64> {
    let value = value.trim_start();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// The `zip_length` header, if present and starting with a number
fn expected_size(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(ZIP_LENGTH_HEADER)?;
    match raw.to_str().ok().and_then(leading_number) {
        Some(size) => Some(size),
        None => {
            warn!("Ignoring unparseable {} header: {:?}", ZIP_LENGTH_HEADER, raw);
            None
        }
    }
}

/// Read the uploaded archive, either the file field of a multipart form
/// or the raw request body
async fn read_archive(request: Request, limit: usize) -> Result<Bytes, SiteError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if !is_multipart {
        return axum::body::to_bytes(request.into_body(), limit)
            .await
            .map_err(|e| SiteError::ExtractionError(format!("Failed to read upload: {}", e)));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| SiteError::ExtractionError(e.body_text()))?;

    let mut first_field = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SiteError::ExtractionError(e.body_text()))?
    {
        let is_file = field.file_name().is_some();
        let data = field
            .bytes()
            .await
            .map_err(|e| SiteError::ExtractionError(e.body_text()))?;
        if is_file {
            return Ok(data);
        }
        first_field.get_or_insert(data);
    }

    first_field.ok_or_else(|| SiteError::ExtractionError("No archive in upload".to_string()))
}

/// `POST /v1/deploy`
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    request: Request,
) -> Result<&'static str, SiteError> {
    let deployment_id = Uuid::new_v4();
    let span = info_span!("deploy", id = %deployment_id);

    async move {
        let supplied = request
            .headers()
            .get(DEPLOYMENT_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        state.secrets.verify(supplied).await.inspect_err(|e| {
            warn!("Rejected deployment: {}", e);
        })?;

        let expected = expected_size(request.headers());
        let request_info = RequestInfo::from_headers(request.headers());

        if let Some(expected) = expected {
            info!("Expected filesize={}", expected);
            let root = state.deployer.layout().root();
            if !has_enough_space(state.disc_space.as_ref(), root, expected).await {
                warn!("Not enough disc space for {} bytes", expected);
                return Err(SiteError::InsufficientStorage(INSUFFICIENT_SPACE.to_string()));
            }
        }

        info!("Starting new deployment");

        let summary = state
            .deployer
            .deploy(read_archive(request, state.max_upload_bytes))
            .await
            .inspect_err(|e| error!("Deployment failed: {}", e))?;

        info!("Deployment finished");
        state.analytics.send_later(
            AnalyticsEvent::deploy(request_info, deployment_id, summary.files),
            state.analytics_delay,
        );

        Ok(DEPLOY_SUCCESS)
    }
    .instrument(span)
    .await
}

/// `POST /v1/deploy/generate-key`
pub async fn generate_key_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<String, SiteError> {
    let secret = state
        .secrets
        .generate(state.key_reload)
        .await
        .inspect_err(|e| warn!("Deploy key generation refused: {}", e))?;

    if state.key_reload == KeyReloadPolicy::Restart {
        info!("Restarting to load the new deploy key");
        state.request_restart();
    }

    Ok(secret)
}
