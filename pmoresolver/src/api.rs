//! Surface HTTP du résolveur
//!
//! Chaque opération est exposée sous `/api/<nom>` avec un corps JSON :
//!
//! - `POST /api/resolve_stream` - `{ resource, force_new }` → `{ stream }`
//! - `POST /api/import` - `{ items }` → rapport d'import
//! - `GET /api/has/{id}` - piste présente dans le cache
//! - `GET /api/fetching/{id}` - résolution en cours
//! - `POST /api/remove/{id}` - retire une piste du cache
//! - `GET /api/sources` - sources enregistrées, par ordre de priorité

use crate::context::ResolverContext;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pmosource::{ImportReport, SourceError, SourceInfo, TrackResource, TrackStreamInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

type SharedContext = Arc<ResolverContext>;

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub resource: TrackResource,
    #[serde(default)]
    pub force_new: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    /// `null` quand aucune source n'a pu résoudre la piste
    pub stream: Option<TrackStreamInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub items: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FlagResponse {
    pub id: String,
    pub value: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourcesList {
    pub count: usize,
    pub sources: Vec<SourceInfo>,
}

/// Message d'erreur
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Erreur de source traduite en réponse HTTP
pub struct ApiError(SourceError);

impl From<SourceError> for ApiError {
    fn from(e: SourceError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SourceError::NotSupported { .. } => StatusCode::BAD_REQUEST,
            SourceError::NoMatch(_) => StatusCode::NOT_FOUND,
            SourceError::Unreachable(_) | SourceError::Provider(_) | SourceError::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn router(context: SharedContext) -> Router {
    Router::new()
        .route("/api/resolve_stream", post(resolve_stream))
        .route("/api/import", post(import))
        .route("/api/has/{id}", get(has))
        .route("/api/fetching/{id}", get(fetching))
        .route("/api/remove/{id}", post(remove))
        .route("/api/sources", get(sources))
        .route("/info", get(info))
        .with_state(context)
}

async fn resolve_stream(
    State(context): State<SharedContext>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    debug!(track = %request.resource.id, force_new = request.force_new, "resolve_stream");
    let stream = context
        .cache
        .get_stream_info(&request.resource, request.force_new)
        .await?;
    Ok(Json(ResolveResponse { stream }))
}

async fn import(
    State(context): State<SharedContext>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<ImportReport>, ApiError> {
    let report = context.registry().import(request.items).await?;
    Ok(Json(report))
}

async fn has(State(context): State<SharedContext>, Path(id): Path<String>) -> Json<FlagResponse> {
    let value = context.cache.has(&id).await;
    Json(FlagResponse { id, value })
}

async fn fetching(
    State(context): State<SharedContext>,
    Path(id): Path<String>,
) -> Json<FlagResponse> {
    let value = context.cache.fetching(&id);
    Json(FlagResponse { id, value })
}

async fn remove(State(context): State<SharedContext>, Path(id): Path<String>) -> StatusCode {
    context.cache.remove(&id).await;
    StatusCode::NO_CONTENT
}

async fn sources(State(context): State<SharedContext>) -> Json<SourcesList> {
    let sources = context.registry().list();
    Json(SourcesList {
        count: sources.len(),
        sources,
    })
}

async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
