//! HTTP access to a running Sentry server.

use crate::CliResult;
use clap::Args;
use reqwest::{Client, IntoUrl, Url};
use reqwest::multipart::{Form, Part};
use sentry_core::HealthReport;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Connection arguments shared by remote commands.
#[derive(Args, Clone, Debug)]
pub struct ServerArgs {
    /// Base URL of the Sentry server.
    #[arg(long = "server", env = "SENTRY_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,
}

/// Server reply to an upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    /// Confirmation message.
    pub message: String,
    /// New project id.
    pub project_id: String,
    /// Stored file name.
    pub filename: String,
    /// Stored size in bytes.
    pub file_size: u64,
    /// Project status after analysis.
    pub status: String,
}

/// Rule counts by severity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueCounts {
    /// Critical rules.
    pub critical: i64,
    /// Warning rules.
    pub warning: i64,
    /// Info rules.
    pub info: i64,
}

/// Project as listed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSummary {
    /// Project id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Uploaded file name.
    pub filename: String,
    /// Formatted size.
    pub file_size: String,
    /// Upload time.
    pub upload_date: String,
    /// Overall score.
    pub health_score: f64,
    /// Project status.
    pub status: String,
    /// Element count.
    pub total_elements: i64,
    /// Validated element count.
    pub validated_elements: i64,
    /// Rule counts.
    pub issues: IssueCounts,
}

/// Persisted rule outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    /// Rule name.
    pub rule_name: String,
    /// Rule category.
    #[serde(default)]
    pub category: String,
    /// Outcome status.
    pub status: String,
    /// Issue count.
    pub issues_count: i64,
    /// Rule description.
    #[serde(default)]
    pub description: String,
}

/// Project with rule outcomes and health report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectDetail {
    /// Listing fields.
    #[serde(flatten)]
    pub project: ProjectSummary,
    /// Rule outcomes.
    #[serde(default)]
    pub validation_results: Vec<ValidationResult>,
    /// Health report, once analysed.
    #[serde(default)]
    pub health_report: Option<HealthReport>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = CliResult<T>> + Send + 'a>>;

/// Operations the CLI performs against a server.
pub trait SentryApi {
    /// Upload model bytes under `filename`.
    fn upload<'a>(
        &'a self,
        server_url: &'a str,
        filename: &'a str,
        contents: Vec<u8>,
    ) -> ApiFuture<'a, UploadResponse>;

    /// List projects.
    fn projects<'a>(&'a self, server_url: &'a str) -> ApiFuture<'a, Vec<ProjectSummary>>;

    /// Fetch one project.
    fn project<'a>(&'a self, server_url: &'a str, id: &'a str) -> ApiFuture<'a, ProjectDetail>;
}

/// Reqwest-backed server client.
#[cfg_attr(test, allow(dead_code))]
pub struct ReqwestSentryClient {
    client: Client,
}

impl ReqwestSentryClient {
    /// Build a client with the CLI user agent.
    #[cfg_attr(test, allow(dead_code))]
    pub fn new() -> CliResult<Self> {
        let client = Client::builder().user_agent("sentry-cli").build()?;
        Ok(Self { client })
    }
}

impl SentryApi for ReqwestSentryClient {
    fn upload<'a>(
        &'a self,
        server_url: &'a str,
        filename: &'a str,
        contents: Vec<u8>,
    ) -> ApiFuture<'a, UploadResponse> {
        Box::pin(post_upload(&self.client, server_url, filename, contents))
    }

    fn projects<'a>(&'a self, server_url: &'a str) -> ApiFuture<'a, Vec<ProjectSummary>> {
        Box::pin(get_json(&self.client, format!("{server_url}/api/projects")))
    }

    fn project<'a>(&'a self, server_url: &'a str, id: &'a str) -> ApiFuture<'a, ProjectDetail> {
        Box::pin(get_project(&self.client, server_url, id))
    }
}

/// Send a model as the multipart `file` field.
#[cfg_attr(test, allow(dead_code))]
async fn post_upload(
    client: &Client,
    server_url: &str,
    filename: &str,
    contents: Vec<u8>,
) -> CliResult<UploadResponse> {
    let part = Part::bytes(contents).file_name(filename.to_string());
    let form = Form::new().part("file", part);
    let response = client
        .post(format!("{server_url}/api/upload"))
        .multipart(form)
        .send()
        .await?;
    read_json(response).await
}

#[cfg_attr(test, allow(dead_code))]
async fn get_project(client: &Client, server_url: &str, id: &str) -> CliResult<ProjectDetail> {
    get_json(client, project_url(server_url, id)?).await
}

#[cfg_attr(test, allow(dead_code))]
async fn get_json<T: DeserializeOwned>(client: &Client, url: impl IntoUrl) -> CliResult<T> {
    let response = client.get(url).send().await?;
    read_json(response).await
}

#[cfg_attr(test, allow(dead_code))]
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> CliResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let body = response.text().await.unwrap_or_default();
    Err(error_message(status.as_u16(), &body).into())
}

/// Describe a failed response, preferring the server's `error` field.
fn error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| body.trim().to_string());
    if detail.is_empty() {
        format!("server returned status {status}")
    } else {
        format!("server returned status {status}: {detail}")
    }
}

/// URL of one project, with the id percent-encoded as a single path segment.
fn project_url(server_url: &str, id: &str) -> CliResult<Url> {
    let mut url = Url::parse(server_url)?;
    url.path_segments_mut()
        .map_err(|_| format!("{server_url} cannot be used as a server url"))?
        .pop_if_empty()
        .extend(["api", "projects", id]);
    Ok(url)
}

/// Normalize the server URL for consistent API requests.
pub fn normalize_server_url(server_url: &str) -> CliResult<String> {
    let trimmed = server_url.trim();
    if trimmed.is_empty() {
        return Err("server url is required".into());
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Read a model from disk and upload it.
pub async fn upload_file<C: SentryApi>(
    client: &C,
    server: &ServerArgs,
    path: &Path,
) -> CliResult<UploadResponse> {
    let server_url = normalize_server_url(&server.server_url)?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("{} has no file name", path.display()))?;
    let contents = tokio::fs::read(path).await?;
    client.upload(&server_url, filename, contents).await
}

/// List projects on the server.
pub async fn list_projects<C: SentryApi>(
    client: &C,
    server: &ServerArgs,
) -> CliResult<Vec<ProjectSummary>> {
    let server_url = normalize_server_url(&server.server_url)?;
    client.projects(&server_url).await
}

/// Fetch one project from the server.
pub async fn fetch_project<C: SentryApi>(
    client: &C,
    server: &ServerArgs,
    id: &str,
) -> CliResult<ProjectDetail> {
    let server_url = normalize_server_url(&server.server_url)?;
    let id = id.trim();
    if id.is_empty() {
        return Err("project id is required".into());
    }
    client.project(&server_url, id).await
}
