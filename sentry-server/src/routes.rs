//! HTTP handlers for the Sentry server.

use std::sync::Arc;

use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::{MultipartForm, MultipartFormConfig};
use actix_multipart::MultipartError;
use actix_web::error::PayloadError;
use actix_web::http::{StatusCode, header};
use actix_web::{HttpRequest, HttpResponse, Responder, ResponseError, get, post, web};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use sentry_core::fixtures::{self, ActivityEntry, IssueShare, ProjectIssue, TrendPoint};
use sentry_core::storage::allowed_file;
use sentry_core::{FileStore, HealthReport, RandomSource, Xorshift64};

use crate::analysis::{AnalysisService, IngestError};
use crate::models::{ProjectRecord, ValidationResultRecord};
use crate::openapi::ApiDoc;
use crate::store::ProjectStore;

/// Days of activity shown on the dashboard.
const ACTIVITY_DAYS: u32 = 7;
/// Activity entries shown on the dashboard.
const ACTIVITY_ENTRIES: usize = 10;
/// Days covered by the health trend.
const TREND_DAYS: u32 = 30;
/// Projects listed under "recent" on the dashboard.
const RECENT_PROJECTS: i64 = 5;

#[derive(Clone)]
/// Shared application state for handlers.
pub struct AppState {
    /// Project persistence.
    pub projects: Arc<dyn ProjectStore>,
    /// Upload storage.
    pub files: Arc<dyn FileStore + Send + Sync>,
    /// Upload analysis.
    pub analysis: AnalysisService,
    /// Fixed simulation seed, if configured.
    pub random_seed: Option<u64>,
}

impl AppState {
    /// Random source for one request.
    pub fn rng(&self) -> Xorshift64 {
        match self.random_seed {
            Some(seed) => Xorshift64::new(seed),
            None => Xorshift64::from_entropy(),
        }
    }
}

/// Error response payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Service banner.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IndexResponse {
    /// Service name.
    pub message: String,
    /// API version.
    pub version: String,
    /// Service state.
    pub status: String,
}

/// Liveness payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthCheckResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    /// ISO-8601 time of the check.
    pub timestamp: String,
    /// `connected` or `unavailable`.
    pub database: String,
}

/// Multipart upload body.
#[derive(Debug, MultipartForm)]
pub struct UploadForm {
    /// The model file.
    pub file: Option<TempFile>,
}

/// Multipart upload body, as documented.
#[derive(Debug, ToSchema)]
pub struct UploadRequest {
    /// The model file.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Response payload for an accepted upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Confirmation message.
    pub message: String,
    /// New project id.
    pub project_id: String,
    /// Sanitised file name.
    pub filename: String,
    /// Stored size in bytes.
    pub file_size: u64,
    /// Project status after analysis.
    pub status: String,
}

/// Per-severity rule counts of a project.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueCounts {
    /// Critical rules.
    pub critical: i32,
    /// Warning rules.
    pub warning: i32,
    /// Info rules.
    pub info: i32,
}

/// Project listing entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    /// Project identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Uploaded file name.
    pub filename: String,
    /// Human readable size, e.g. `12.3 MB`.
    pub file_size: String,
    /// ISO-8601 upload time.
    pub upload_date: String,
    /// Overall health score.
    pub health_score: f64,
    /// Project status.
    pub status: String,
    /// Element count.
    pub total_elements: i64,
    /// Validated element count.
    pub validated_elements: i64,
    /// Rule counts by severity.
    pub issues: IssueCounts,
}

impl From<&ProjectRecord> for ProjectResponse {
    fn from(project: &ProjectRecord) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            filename: project.filename.clone(),
            file_size: format_megabytes(project.file_size),
            upload_date: iso_timestamp(project.upload_date),
            health_score: project.health_score,
            status: project.status.clone(),
            total_elements: project.total_elements,
            validated_elements: project.validated_elements,
            issues: IssueCounts {
                critical: project.critical_issues,
                warning: project.warning_issues,
                info: project.info_issues,
            },
        }
    }
}

/// One persisted rule outcome.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationResultResponse {
    /// Rule name.
    pub rule_name: String,
    /// Rule category.
    pub category: String,
    /// Outcome status.
    pub status: String,
    /// Issue count.
    pub issues_count: i32,
    /// Rule description.
    pub description: String,
    /// ISO-8601 creation time.
    pub created_date: String,
}

impl From<ValidationResultRecord> for ValidationResultResponse {
    fn from(record: ValidationResultRecord) -> Self {
        Self {
            rule_name: record.rule_name,
            category: record.category,
            status: record.status,
            issues_count: record.issues_count,
            description: record.description,
            created_date: iso_timestamp(record.created_date),
        }
    }
}

/// Project with its rule outcomes and health report.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectDetailResponse {
    /// Project fields.
    #[serde(flatten)]
    pub project: ProjectResponse,
    /// Rule outcomes in evaluation order.
    pub validation_results: Vec<ValidationResultResponse>,
    /// Stored health report, when analysis completed.
    pub health_report: Option<HealthReport>,
}

/// Dashboard headline numbers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    /// Number of projects.
    pub total_projects: i64,
    /// Number of completed projects.
    pub completed_projects: i64,
    /// Mean score of completed projects, one decimal.
    pub average_health_score: f64,
    /// Issues counted as resolved.
    pub total_issues_resolved: i64,
}

/// Recent project entry on the dashboard.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecentProject {
    /// Project identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Overall health score.
    pub health_score: f64,
    /// Project status.
    pub status: String,
    /// ISO-8601 upload time.
    pub upload_date: String,
}

/// Dashboard response payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    /// Headline numbers.
    pub summary: DashboardSummary,
    /// Most recent uploads.
    pub recent_projects: Vec<RecentProject>,
    /// Activity feed.
    pub recent_activity: Vec<ActivityEntry>,
    /// Daily health trend.
    pub health_trend: Vec<TrendPoint>,
    /// Issue mix.
    pub issue_distribution: Vec<IssueShare>,
}

fn iso_timestamp(value: NaiveDateTime) -> String {
    value.and_utc().to_rfc3339()
}

fn format_megabytes(bytes: i64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: message.into(),
    })
}

fn internal_error(context: &str, err: impl std::fmt::Display) -> HttpResponse {
    log::error!("{context}: {err}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// Multipart limits with JSON error bodies.
///
/// Bodies over `max_upload_bytes` are answered with 413.
pub fn multipart_config(max_upload_bytes: usize) -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(max_upload_bytes)
        .error_handler(move |err, req| {
            let (status, message) = if exceeds_upload_limit(&err, req, max_upload_bytes) {
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("File too large. Uploads are limited to {max_upload_bytes} bytes"),
                )
            } else {
                (err.status_code(), err.to_string())
            };
            let response = error_response(status, message);
            actix_web::error::InternalError::from_response(err, response).into()
        })
}

fn exceeds_upload_limit(err: &MultipartError, req: &HttpRequest, max_upload_bytes: usize) -> bool {
    if matches!(err, MultipartError::Payload(PayloadError::Overflow)) {
        return true;
    }
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<usize>().ok())
        .is_some_and(|length| length > max_upload_bytes)
}

/// Register every route and the JSON 404 fallback.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(health_check)
        .service(upload)
        .service(list_projects)
        .service(project_detail)
        .service(dashboard)
        .service(project_issues)
        .service(openapi_json)
        .default_service(web::route().to(not_found));
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = IndexResponse)
    ),
    tag = "system"
)]
#[get("/")]
/// Identify the service.
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(IndexResponse {
        message: "IFC Model Health Dashboard API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Liveness", body = HealthCheckResponse)
    ),
    tag = "system"
)]
#[get("/api/health")]
/// Report liveness and database reachability.
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let projects = state.projects.clone();
    let reachable = matches!(web::block(move || projects.ping()).await, Ok(Ok(())));
    if !reachable {
        log::warn!("health check could not reach the database");
    }
    let (status, database) = if reachable {
        ("healthy", "connected")
    } else {
        ("degraded", "unavailable")
    };
    HttpResponse::Ok().json(HealthCheckResponse {
        status: status.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        database: database.to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = UploadRequest, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload stored and analysed", body = UploadResponse),
        (status = 400, description = "Missing or disallowed file", body = ErrorResponse),
        (status = 413, description = "Upload over the size limit", body = ErrorResponse),
        (status = 500, description = "Upload failed", body = ErrorResponse)
    ),
    tag = "projects"
)]
#[post("/api/upload")]
/// Store an uploaded model and analyse it.
pub async fn upload(
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<UploadForm>,
) -> impl Responder {
    let Some(file) = form.file else {
        return error_response(StatusCode::BAD_REQUEST, "No file provided");
    };
    let filename = file.file_name.clone().unwrap_or_default();
    if filename.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No file selected");
    }
    if !allowed_file(&filename) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "File type not allowed. Please upload .ifc files only",
        );
    }

    let result = web::block(move || {
        let mut rng = state.rng();
        state.analysis.ingest(
            state.projects.as_ref(),
            state.files.as_ref(),
            &filename,
            file.file.path(),
            &mut rng,
        )
    })
    .await;

    match result {
        Ok(Ok(receipt)) => HttpResponse::Ok().json(UploadResponse {
            message: "File uploaded successfully".to_string(),
            project_id: receipt.project_id,
            filename: receipt.filename,
            file_size: receipt.file_size,
            status: receipt.status.as_str().to_string(),
        }),
        Ok(Err(IngestError::Rejected(message))) => {
            error_response(StatusCode::BAD_REQUEST, message)
        }
        Ok(Err(err)) => internal_error("upload failed", err),
        Err(err) => internal_error("upload task failed", err),
    }
}

#[utoipa::path(
    get,
    path = "/api/projects",
    responses(
        (status = 200, description = "Projects, newest first", body = [ProjectResponse]),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "projects"
)]
#[get("/api/projects")]
/// List projects newest first.
pub async fn list_projects(state: web::Data<AppState>) -> impl Responder {
    let projects = state.projects.clone();
    match web::block(move || projects.list_projects(None)).await {
        Ok(Ok(records)) => {
            let body: Vec<ProjectResponse> = records.iter().map(ProjectResponse::from).collect();
            HttpResponse::Ok().json(body)
        }
        Ok(Err(err)) => internal_error("listing projects failed", err),
        Err(err) => internal_error("listing task failed", err),
    }
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    params(
        ("id" = String, Path, description = "Project identifier")
    ),
    responses(
        (status = 200, description = "Project details", body = ProjectDetailResponse),
        (status = 404, description = "Unknown project", body = ErrorResponse)
    ),
    tag = "projects"
)]
#[get("/api/projects/{id}")]
/// Fetch a project with its rule outcomes.
pub async fn project_detail(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let project_id = path.into_inner();
    let projects = state.projects.clone();
    let result = web::block(move || {
        let Some(project) = projects.find_project(&project_id)? else {
            return Ok(None);
        };
        let results = projects.validation_results(&project.id)?;
        Ok::<_, crate::store::StoreError>(Some((project, results)))
    })
    .await;

    match result {
        Ok(Ok(Some((project, results)))) => HttpResponse::Ok().json(ProjectDetailResponse {
            health_report: project.report(),
            project: ProjectResponse::from(&project),
            validation_results: results
                .into_iter()
                .map(ValidationResultResponse::from)
                .collect(),
        }),
        Ok(Ok(None)) => error_response(StatusCode::NOT_FOUND, "Project not found"),
        Ok(Err(err)) => internal_error("loading project failed", err),
        Err(err) => internal_error("project task failed", err),
    }
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard data", body = DashboardResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "dashboard"
)]
#[get("/api/dashboard")]
/// Summary numbers, recent projects, and simulated activity.
pub async fn dashboard(state: web::Data<AppState>) -> impl Responder {
    let projects = state.projects.clone();
    let result = web::block(move || {
        let stats = projects.stats()?;
        let recent = projects.list_projects(Some(RECENT_PROJECTS))?;
        Ok::<_, crate::store::StoreError>((stats, recent))
    })
    .await;

    let (stats, recent) = match result {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => return internal_error("loading dashboard failed", err),
        Err(err) => return internal_error("dashboard task failed", err),
    };

    let mut rng = state.rng();
    let now = Utc::now();
    let unresolved = rng.range_i64(0, stats.total_issues / 3);
    HttpResponse::Ok().json(DashboardResponse {
        summary: DashboardSummary {
            total_projects: stats.total,
            completed_projects: stats.completed,
            average_health_score: (stats.average_score * 10.0).round() / 10.0,
            total_issues_resolved: (stats.total_issues - unresolved).max(0),
        },
        recent_projects: recent
            .iter()
            .map(|project| RecentProject {
                id: project.id.clone(),
                name: project.name.clone(),
                health_score: project.health_score,
                status: project.status.clone(),
                upload_date: iso_timestamp(project.upload_date),
            })
            .collect(),
        recent_activity: fixtures::recent_activity(now, ACTIVITY_DAYS, ACTIVITY_ENTRIES, &mut rng),
        health_trend: fixtures::health_trend(now, TREND_DAYS, &mut rng),
        issue_distribution: fixtures::issue_distribution(&mut rng),
    })
}

#[utoipa::path(
    get,
    path = "/api/issues/{id}",
    params(
        ("id" = String, Path, description = "Project identifier")
    ),
    responses(
        (status = 200, description = "Simulated issues", body = [ProjectIssue]),
        (status = 404, description = "Unknown project", body = ErrorResponse)
    ),
    tag = "projects"
)]
#[get("/api/issues/{id}")]
/// Simulated issue list for an existing project.
pub async fn project_issues(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let project_id = path.into_inner();
    let projects = state.projects.clone();
    let lookup_id = project_id.clone();
    match web::block(move || projects.find_project(&lookup_id)).await {
        Ok(Ok(Some(_))) => {
            let mut rng = state.rng();
            let count = rng.range_u64(10, 50) as usize;
            HttpResponse::Ok().json(fixtures::project_issues(
                Utc::now(),
                &project_id,
                count,
                &mut rng,
            ))
        }
        Ok(Ok(None)) => error_response(StatusCode::NOT_FOUND, "Project not found"),
        Ok(Err(err)) => internal_error("loading project failed", err),
        Err(err) => internal_error("issues task failed", err),
    }
}

#[utoipa::path(
    get,
    path = "/api/openapi.json",
    responses(
        (status = 200, description = "OpenAPI document", body = serde_json::Value)
    ),
    tag = "system"
)]
#[get("/api/openapi.json")]
/// Serve the OpenAPI document.
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Fallback for unknown routes.
pub async fn not_found() -> HttpResponse {
    error_response(StatusCode::NOT_FOUND, "Endpoint not found")
}
