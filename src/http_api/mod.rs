use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    Class, ClassDetail, ClassStore, ClassSummary, EnrollmentAction, ImportReport,
    PersistenceError, Professor, SwapRecommendations, export_classes_to_string, import_roster,
    recommend_swaps,
};

const DEFAULT_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ClassStore + Send + Sync>,
    upload_limit: usize,
}

impl AppState {
    pub fn new<S>(store: S) -> Self
    where
        S: ClassStore + Send + Sync + 'static,
    {
        Self::with_shared(Arc::new(store))
    }

    pub fn with_shared(store: Arc<dyn ClassStore + Send + Sync>) -> Self {
        Self {
            store,
            upload_limit: DEFAULT_UPLOAD_LIMIT,
        }
    }

    pub fn with_upload_limit(mut self, upload_limit: usize) -> Self {
        self.upload_limit = upload_limit;
        self
    }

    fn store(&self) -> &(dyn ClassStore + Send + Sync) {
        self.store.as_ref()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::NotFound { .. } => ApiError::NotFound(value.to_string()),
            err if err.is_client_error() => ApiError::Invalid(err.to_string()),
            err => {
                tracing::error!(error = %err, "request failed");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Invalid(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Invalid(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
            ),
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct EnrollmentPayload {
    action: String,
}

#[derive(Debug, Deserialize)]
struct SwapClassroomsPayload {
    crowded_id: i64,
    target_id: i64,
    #[serde(default)]
    different_timeslot: bool,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    message: &'static str,
    file_name: Option<String>,
    report: ImportReport,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);
    let upload_limit = state.upload_limit;

    Router::new()
        .route("/health", get(health))
        .route("/classes", get(list_classes))
        .route("/class/:id", get(get_class))
        .route("/class/:id/professors", get(class_professors))
        .route("/class/:id/update-enrollment", post(update_enrollment))
        .route("/class/:id/swap/:swap_id", post(swap_classes))
        .route(
            "/class/:id/possible-reassignments",
            get(possible_reassignments),
        )
        .route("/professors", get(list_professors))
        .route("/swap-classrooms", post(swap_classrooms))
        .route("/swap-recommendations", get(swap_recommendations))
        .route("/upload", post(upload_roster))
        .route("/export", get(export_roster))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve<S>(addr: SocketAddr, store: S, upload_limit: usize) -> std::io::Result<()>
where
    S: ClassStore + Send + Sync + 'static,
{
    let state = AppState::new(store).with_upload_limit(upload_limit);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_classes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassSummary>>, ApiError> {
    Ok(Json(state.store().list_classes()?))
}

async fn get_class(
    State(state): State<AppState>,
    class_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ClassDetail>, ApiError> {
    let Path(class_id) = class_id?;
    let class = state.store().get_class(class_id)?;
    Ok(Json(class.detail()))
}

async fn class_professors(
    State(state): State<AppState>,
    class_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Professor>>, ApiError> {
    let Path(class_id) = class_id?;
    Ok(Json(state.store().professors_for_class(class_id)?))
}

async fn list_professors(
    State(state): State<AppState>,
) -> Result<Json<Vec<Professor>>, ApiError> {
    Ok(Json(state.store().list_professors()?))
}

async fn update_enrollment(
    State(state): State<AppState>,
    class_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<EnrollmentPayload>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Path(class_id) = class_id?;
    let Json(payload) = payload?;
    let action: EnrollmentAction = payload.action.parse().map_err(ApiError::invalid)?;
    let enrollment = state.store().update_enrollment(class_id, action)?;
    Ok(Json(json!({ "enrollment": enrollment })))
}

async fn swap_classes(
    State(state): State<AppState>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Path((class_id, swap_id)) = ids?;
    state.store().swap_rooms(class_id, swap_id, false)?;
    Ok(Json(json!({ "message": "Successfully swapped classes." })))
}

async fn swap_classrooms(
    State(state): State<AppState>,
    payload: Result<Json<SwapClassroomsPayload>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(payload) = payload?;
    state.store().swap_rooms(
        payload.crowded_id,
        payload.target_id,
        payload.different_timeslot,
    )?;
    Ok(Json(json!({ "message": "Successfully swapped classes." })))
}

async fn possible_reassignments(
    State(state): State<AppState>,
    class_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Class>>, ApiError> {
    let Path(class_id) = class_id?;
    Ok(Json(state.store().possible_reassignments(class_id)?))
}

async fn swap_recommendations(
    State(state): State<AppState>,
) -> Result<Json<SwapRecommendations>, ApiError> {
    let classes = state.store().all_classes()?;
    Ok(Json(recommend_swaps(&classes)))
}

async fn upload_roster(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::invalid(err.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::invalid(err.body_text()))?;
        let report = import_roster(state.store(), bytes.as_ref())?;
        return Ok(Json(UploadResponse {
            message: "File uploaded successfully!",
            file_name,
            report,
        }));
    }
    Err(ApiError::invalid("No file uploaded"))
}

async fn export_roster(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = export_classes_to_string(state.store())?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"output.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}
