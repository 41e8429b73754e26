//! HTTP surface of the metadata service.
//!
//! - `GET /health`
//! - `GET /metadata?path=/items/42/&lang=es&query=desk-lamps` resolves one
//!   page; every parameter other than `path` and `lang` is placeholder
//!   context.
//! - `POST /sync` runs the batch sync pass (requires `X-API-Key`).

use crate::config::Config;
use crate::db::Database;
use crate::entity::EntityRegistry;
use crate::error::SeoError;
use crate::models::Metadata;
use crate::resolver::Resolver;
use crate::security::api_key_matches;
use crate::sync::{SeoSignals, SyncReport};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub entities: Arc<EntityRegistry>,
}

/// Error response: a status code and a message rendered as
/// `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<SeoError> for ApiError {
    fn from(err: SeoError) -> Self {
        let status = match err {
            SeoError::Validation(_) | SeoError::Configuration(_) => StatusCode::BAD_REQUEST,
            SeoError::Store(_) | SeoError::EntityLookup(_) | SeoError::LockPoisoned => {
                error!("Store failure: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metadata", get(metadata))
        .route("/sync", post(sync_content))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn metadata(
    State(state): State<Arc<AppState>>,
    Query(mut params): Query<HashMap<String, String>>,
) -> Result<Json<Metadata>, ApiError> {
    let path = params
        .remove("path")
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "missing 'path' parameter"))?;
    let lang = params
        .remove("lang")
        .unwrap_or_else(|| state.config.seo.default_lang().to_string());
    let context: BTreeMap<String, String> = params.into_iter().collect();

    let resolved = tokio::task::spawn_blocking(move || {
        Resolver::new(&state.db, &state.config.seo, &state.entities)
            .resolve(&path, &lang, None, &context)
    })
    .await
    .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    Ok(Json(resolved))
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    /// Entity types to sync; defaults to every configured type.
    #[serde(default)]
    pub models: Option<Vec<String>>,
    /// Languages to create missing entity records in.
    #[serde(default)]
    pub languages: Vec<String>,
}

async fn sync_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncReport>, ApiError> {
    let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if !api_key_matches(state.config.api_key.as_deref(), provided) {
        warn!("Rejected /sync request with missing or invalid API key");
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized"));
    }

    let report = tokio::task::spawn_blocking(move || {
        let models = request
            .models
            .unwrap_or_else(|| state.config.seo.seo_models.clone());
        SeoSignals::connect(&state.db, &state.config.seo, &state.entities)?
            .sync_content(&models, &request.languages)
    })
    .await
    .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    info!("Sync finished: {:?}", report);
    Ok(Json(report))
}
