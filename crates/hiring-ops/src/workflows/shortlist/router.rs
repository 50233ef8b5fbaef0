use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;

use super::export::ExportFormat;
use super::remote::{CandidateScorer, SlateSelector};
use super::scoring::RowId;
use super::service::{ShortlistService, ShortlistServiceError};
use super::session::SessionSnapshot;
use super::views::SortDirection;

type SharedService<S, P> = Arc<ShortlistService<S, P>>;

/// Router builder exposing the shortlisting session over HTTP.
pub fn shortlist_router<S, P>(service: SharedService<S, P>) -> Router
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    Router::new()
        .route("/api/v1/session", get(snapshot_handler::<S, P>))
        .route("/api/v1/session/upload", post(upload_handler::<S, P>))
        .route("/api/v1/session/score", post(score_handler::<S, P>))
        .route("/api/v1/session/select", post(select_handler::<S, P>))
        .route(
            "/api/v1/session/selection/toggle",
            post(toggle_handler::<S, P>),
        )
        .route(
            "/api/v1/session/selection/all",
            post(toggle_all_handler::<S, P>),
        )
        .route("/api/v1/session/sort", post(sort_handler::<S, P>))
        .route("/api/v1/session/shortlist", post(shortlist_handler::<S, P>))
        .route("/api/v1/session/export", get(export_handler::<S, P>))
        .route("/api/v1/session/rows/:row_id", get(row_detail_handler::<S, P>))
        .route("/api/v1/session/picks/:email", get(pick_detail_handler::<S, P>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UploadParams {
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToggleRequest {
    id: RowId,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SortRequest {
    #[serde(default)]
    direction: Option<SortDirection>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportParams {
    format: Option<String>,
}

pub(crate) async fn snapshot_handler<S, P>(State(service): State<SharedService<S, P>>) -> Response
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    (StatusCode::OK, Json(service.snapshot())).into_response()
}

pub(crate) async fn upload_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    snapshot_response(service.upload(&body, params.file_name))
}

pub(crate) async fn score_handler<S, P>(State(service): State<SharedService<S, P>>) -> Response
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    snapshot_response(service.score().await)
}

pub(crate) async fn select_handler<S, P>(State(service): State<SharedService<S, P>>) -> Response
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    snapshot_response(service.select().await)
}

pub(crate) async fn toggle_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Json(request): Json<ToggleRequest>,
) -> Response
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    snapshot_response(service.toggle_selection(&request.id))
}

pub(crate) async fn toggle_all_handler<S, P>(
    State(service): State<SharedService<S, P>>,
) -> Response
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    snapshot_response(service.toggle_select_all())
}

pub(crate) async fn sort_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    request: Option<Json<SortRequest>>,
) -> Response
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    let direction = request.and_then(|Json(request)| request.direction);
    (StatusCode::OK, Json(service.sort(direction))).into_response()
}

pub(crate) async fn shortlist_handler<S, P>(
    State(service): State<SharedService<S, P>>,
) -> Response
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    snapshot_response(service.shortlist())
}

pub(crate) async fn export_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Query(params): Query<ExportParams>,
) -> Response
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    let format = match params.format.as_deref().map(ExportFormat::parse) {
        None => None,
        Some(Some(format)) => Some(format),
        Some(None) => {
            let payload = json!({
                "error": format!(
                    "unsupported export format `{}`",
                    params.format.unwrap_or_default()
                ),
            });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    match service.export(format) {
        Ok(export) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, export.content_type.clone()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", export.file_name),
                ),
            ],
            export.bytes,
        )
            .into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn row_detail_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path(row_id): Path<String>,
) -> Response
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    let id = RowId(row_id);
    match service.row_detail(&id) {
        Some(view) => (StatusCode::OK, Json(view)).into_response(),
        None => not_found(format!("row {id} is not part of the current results")),
    }
}

pub(crate) async fn pick_detail_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path(email): Path<String>,
) -> Response
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    match service.pick_detail(&email) {
        Some(view) => (StatusCode::OK, Json(view)).into_response(),
        None => not_found(format!("no slate pick for {email}")),
    }
}

fn snapshot_response(result: Result<SessionSnapshot, ShortlistServiceError>) -> Response {
    match result {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

fn not_found(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}
