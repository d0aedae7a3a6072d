use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use shared::{
    domain::{ClassificationItem, ImageRef, ItemId, ReferenceImage, TaskId},
    error::{ApiError, ErrorCode},
    protocol::{
        LoginRequest, LoginResponse, NextBatchResponse, ProgressResponse, SubmitAck, SwipeResult,
    },
};
use tokio::sync::Mutex;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, FixtureUser, Settings};

const MAX_BODY_BYTES: usize = 64 * 1024;
const FIRST_IMAGE_ID: u64 = 1234;
const HORNET_TASK: TaskId = TaskId(7);

type ApiResult<T> = Result<Json<T>, Rejection>;

struct AppState {
    access_token: String,
    batch_size: usize,
    users: Vec<FixtureUser>,
    catalog: Vec<ClassificationItem>,
    classified: Mutex<HashMap<ItemId, SwipeResult>>,
}

impl AppState {
    fn from_settings(settings: Settings) -> Self {
        Self {
            catalog: hornet_catalog(settings.catalog_size),
            access_token: settings.access_token,
            batch_size: settings.batch_size,
            users: settings.users,
            classified: Mutex::new(HashMap::new()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_settings();
    let addr: SocketAddr = settings.bind_addr.parse()?;
    let state = AppState::from_settings(settings);
    info!(items = state.catalog.len(), "mock backend catalogue ready");
    let app = build_router(Arc::new(state));

    info!(%addr, "mock backend listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/classifications/next-batch", get(next_batch))
        .route("/api/v1/classifications/progress", get(progress))
        .route("/api/v1/classifications/:item_id/submit", post(submit))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

const TRAP_SITES: u64 = 3;

/// Trap-camera images awaiting a hornet/not-hornet judgment. Each item is
/// paired with the species sheet and an empty-trap shot of its own site.
fn hornet_catalog(size: usize) -> Vec<ClassificationItem> {
    (FIRST_IMAGE_ID..)
        .take(size)
        .map(|image_id| {
            let site = image_id % TRAP_SITES + 1;
            ClassificationItem {
                id: ItemId::new(image_id.to_string()),
                task_id: Some(HORNET_TASK),
                prompt: "Is this a Vespa mandarinia?".into(),
                image: ImageRef::uri(format!("https://traps.example/captures/{image_id}.jpg")),
                reference_images: vec![
                    ReferenceImage {
                        image: ImageRef::uri("https://traps.example/species/vespa-mandarinia.jpg"),
                        caption: Some("Species sheet".into()),
                    },
                    ReferenceImage {
                        image: ImageRef::uri(format!(
                            "https://traps.example/sites/{site}/empty.jpg"
                        )),
                        caption: Some(format!("Trap site {site}, empty")),
                    },
                ],
            }
        })
        .collect()
}

type Rejection = (StatusCode, Json<ApiError>);

fn api_error(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Rejection {
    (status, Json(ApiError::new(code, message)))
}

fn unauthorized(message: &str) -> Rejection {
    api_error(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, message)
}

fn require_bearer(state: &AppState, headers: &HeaderMap) -> Result<(), Rejection> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if token == state.access_token => Ok(()),
        Some(_) => {
            warn!("auth: rejected bearer token");
            Err(unauthorized("invalid access token"))
        }
        None => Err(unauthorized("missing bearer token")),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let user = state
        .users
        .iter()
        .find(|u| u.username == req.username && u.password == req.password)
        .ok_or_else(|| {
            warn!(username = %req.username, "auth: login rejected");
            unauthorized("invalid username or password")
        })?;

    info!(username = %user.username, role = ?user.role, "auth: login accepted");
    Ok(Json(LoginResponse {
        access_token: state.access_token.clone(),
        role: user.role,
    }))
}

async fn next_batch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<NextBatchResponse> {
    require_bearer(&state, &headers)?;

    let classified = state.classified.lock().await;
    let items: Vec<ClassificationItem> = state
        .catalog
        .iter()
        .filter(|item| !classified.contains_key(&item.id))
        .take(state.batch_size)
        .cloned()
        .collect();
    info!(items = items.len(), "classifications: served batch");
    Ok(Json(NextBatchResponse { items }))
}

async fn submit(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    Json(result): Json<SwipeResult>,
) -> ApiResult<SubmitAck> {
    require_bearer(&state, &headers)?;

    let item_id = ItemId::new(item_id);
    if result.item_id != item_id {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            ErrorCode::Validation,
            format!("body item '{}' does not match route item '{item_id}'", result.item_id),
        ));
    }
    if !state.catalog.iter().any(|item| item.id == item_id) {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            format!("unknown item '{item_id}'"),
        ));
    }

    let mut classified = state.classified.lock().await;
    match classified.get(&item_id) {
        Some(existing) if existing.submission_id == result.submission_id => {
            info!(
                %item_id,
                submission_id = %result.submission_id,
                "classifications: duplicate submission acknowledged"
            );
        }
        Some(existing) => {
            warn!(
                %item_id,
                existing = %existing.submission_id,
                "classifications: item already classified"
            );
            return Err(api_error(
                StatusCode::CONFLICT,
                ErrorCode::Conflict,
                format!("item '{item_id}' is already classified"),
            ));
        }
        None => {
            info!(
                %item_id,
                direction = result.direction.as_str(),
                "classifications: result recorded"
            );
            classified.insert(item_id.clone(), result);
        }
    }

    Ok(Json(SubmitAck {
        item_id,
        accepted_at: Utc::now(),
    }))
}

async fn progress(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<ProgressResponse> {
    require_bearer(&state, &headers)?;

    let completed = state.classified.lock().await.len();
    let remaining = state.catalog.len().saturating_sub(completed);
    Ok(Json(ProgressResponse {
        completed: completed as u64,
        remaining: remaining as u64,
    }))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
