//! Axum route handlers for the Datasets API.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::datasets::store::SlotSummary;
use crate::datasets::{load_dataset, DatasetKind, DatasetStatus};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DatasetListResponse {
    pub datasets: Vec<SlotSummary>,
    pub ready: bool,
    pub missing: Vec<DatasetKind>,
}

#[derive(Debug, Serialize)]
pub struct DatasetLoadResponse {
    pub kind: DatasetKind,
    #[serde(flatten)]
    pub status: DatasetStatus,
    pub ready: bool,
}

fn parse_kind(raw: &str) -> Result<DatasetKind, AppError> {
    raw.parse::<DatasetKind>().map_err(AppError::NotFound)
}

fn decode_text(body: &[u8]) -> Result<String, AppError> {
    String::from_utf8(body.to_vec())
        .map_err(|_| AppError::Validation("dataset body must be UTF-8 text".to_string()))
}

/// Parses `text` as `kind` and writes the outcome into that slot only.
async fn load_into_slot(
    state: &AppState,
    kind: DatasetKind,
    text: &str,
) -> Result<DatasetLoadResponse, AppError> {
    let outcome = load_dataset(kind, text);

    let mut session = state.session.write().await;
    match session.datasets.apply(kind, outcome) {
        Ok(status) => {
            if let DatasetStatus::Loaded { rows, .. } = &status {
                info!("Loaded {kind} dataset ({rows} rows)");
            }
            Ok(DatasetLoadResponse {
                kind,
                status,
                ready: session.datasets.is_ready(),
            })
        }
        Err(e) => {
            warn!("Rejected {kind} dataset: {e}");
            Err(e.into())
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/datasets
pub async fn handle_list_datasets(
    State(state): State<AppState>,
) -> Json<DatasetListResponse> {
    let session = state.session.read().await;
    Json(DatasetListResponse {
        datasets: session.datasets.summaries(),
        ready: session.datasets.is_ready(),
        missing: session.datasets.missing_required(),
    })
}

/// PUT /api/v1/datasets/:kind
///
/// Body is the raw CSV text.
pub async fn handle_put_dataset(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Bytes,
) -> Result<Json<DatasetLoadResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let text = decode_text(&body)?;
    Ok(Json(load_into_slot(&state, kind, &text).await?))
}

/// POST /api/v1/datasets/:kind
///
/// `multipart/form-data` upload; the CSV is read from the `file` field.
pub async fn handle_upload_dataset(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<DatasetLoadResponse>, AppError> {
    let kind = parse_kind(&kind)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("could not read upload: {e}")))?;
        let text = decode_text(&body)?;
        return Ok(Json(load_into_slot(&state, kind, &text).await?));
    }

    Err(AppError::Validation(
        "multipart body must include a 'file' field".to_string(),
    ))
}

/// DELETE /api/v1/datasets/:kind
pub async fn handle_clear_dataset(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<StatusCode, AppError> {
    let kind = parse_kind(&kind)?;
    state.session.write().await.datasets.clear(kind);
    info!("Cleared {kind} dataset");
    Ok(StatusCode::NO_CONTENT)
}
