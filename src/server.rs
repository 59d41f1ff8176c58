use crate::{
    config::Config,
    errors::{AppError, AppResult},
    service::{CreateProject, HostingService, ProjectList, Served, UpdateProject, UploadSummary, UploadedFile},
    store::{FileRecord, Project},
};
use axum::{
    body::Body,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use http::{header, HeaderValue, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use serde_with::{serde_as, NoneAsEmptyString};
use std::{convert::Infallible, sync::Arc, time::Instant};
use tower::ServiceExt;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    services::{ServeDir, ServeFile},
};

/// Allowance for multipart boundaries and part headers on top of the payload
/// ceiling, so a batch of exactly the ceiling is not cut off by the body limit.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub service: Arc<HostingService>,
    pub started: Instant,
}

impl AppState {
    pub fn new(cfg: Config, service: HostingService) -> Self {
        Self { cfg: Arc::new(cfg), service: Arc::new(service), started: Instant::now() }
    }
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: std::net::SocketAddr = format!("{}:{}", state.cfg.server.bind_addr, state.cfg.server.port).parse()?;
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.service.upload_limit().max_bytes().saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/projects", post(create_project).get(list_projects))
        .route(
            "/api/projects/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route(
            "/api/projects/:id/files",
            post(upload_files)
                .layer::<_, Infallible>(DefaultBodyLimit::disable())
                .layer::<_, Infallible>(RequestBodyLimitLayer::new(body_limit))
                .get(list_files),
        )
        .layer(CorsLayer::permissive());

    let view = Router::new()
        .route("/view/:id_or_name", get(view_entry))
        .route("/view/:id_or_name/", get(view_entry))
        .route("/view/:id_or_name/*sub_path", get(view_file));

    let mut app = api.merge(view);
    if let Some(ui_dir) = &state.cfg.storage.ui_dir {
        app = app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
    }
    app.layer(middleware::from_fn(audit)).with_state(state)
}

async fn audit(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut resp = next.run(req).await;
    if let Ok(v) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert("x-request-id", v);
    }
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = resp.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        "audit"
    );
    resp
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"status": "ok", "uptime_seconds": state.started.elapsed().as_secs_f64()}))
}

async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let project = state.service.create_project(req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    search: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    limit: Option<u32>,
}

async fn list_projects(State(state): State<AppState>, Query(q): Query<ListQuery>) -> AppResult<Json<ProjectList>> {
    Ok(Json(state.service.list_projects(q.search, q.limit).await?))
}

async fn get_project(State(state): State<AppState>, Path(id_or_name): Path<String>) -> AppResult<Json<Project>> {
    Ok(Json(state.service.get_project(&id_or_name).await?))
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProject>,
) -> AppResult<Json<Project>> {
    Ok(Json(state.service.update_project(&id, req).await?))
}

async fn delete_project(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    state.service.delete_project(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadSummary>> {
    let limit = state.service.upload_limit().max_bytes();
    let read_err = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge { limit }
        } else {
            AppError::BadRequest(e.body_text())
        }
    };

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(read_err)? {
        // Plain form fields carry no filename and are not files.
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(read_err)?;
        files.push(UploadedFile { filename, bytes });
    }
    if files.is_empty() {
        return Err(AppError::BadRequest("no files received in multipart upload".into()));
    }

    Ok(Json(state.service.upload(&id, files).await?))
}

async fn list_files(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Vec<FileRecord>>> {
    Ok(Json(state.service.list_files(&id).await?))
}

async fn view_entry(
    State(state): State<AppState>,
    Path(id_or_name): Path<String>,
    req: Request,
) -> AppResult<Response> {
    let served = state.service.resolve_entry(&id_or_name).await?;
    send_file(served, req).await
}

async fn view_file(
    State(state): State<AppState>,
    Path((id_or_name, sub_path)): Path<(String, String)>,
    req: Request,
) -> AppResult<Response> {
    let served = if sub_path.is_empty() {
        state.service.resolve_entry(&id_or_name).await?
    } else {
        state.service.resolve_file(&id_or_name, &sub_path).await?
    };
    send_file(served, req).await
}

/// Stream a resolved file back with its media type and open CORS headers.
async fn send_file(served: Served, req: Request) -> AppResult<Response> {
    let content_type = served.content_type.parse::<mime_guess::mime::Mime>()
        .map_err(|_| AppError::Internal(format!("invalid content type {}", served.content_type)))?;
    let resp = ServeFile::new_with_mime(&served.path, &content_type)
        .oneshot(req)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    // Removed between resolution and open.
    if resp.status() == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound("file not found".into()));
    }

    let mut resp = resp.map(Body::new);
    let headers = resp.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    Ok(resp)
}
