//! OpenAPI specification for the Sentry server.

use utoipa::OpenApi;

use sentry_core::fixtures::{
    ActivityEntry, Coordinates, IssueComment, IssueLocation, IssueShare, ProjectIssue, TrendPoint,
};
use sentry_core::{HealthGrade, HealthReport, OutcomeStatus, Priority, Recommendation};

use crate::routes::{
    DashboardResponse, DashboardSummary, ErrorResponse, HealthCheckResponse, IndexResponse,
    IssueCounts, ProjectDetailResponse, ProjectResponse, RecentProject, UploadRequest,
    UploadResponse, ValidationResultResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::index,
        crate::routes::health_check,
        crate::routes::upload,
        crate::routes::list_projects,
        crate::routes::project_detail,
        crate::routes::dashboard,
        crate::routes::project_issues,
        crate::routes::openapi_json
    ),
    components(
        schemas(
            ErrorResponse,
            IndexResponse,
            HealthCheckResponse,
            UploadRequest,
            UploadResponse,
            IssueCounts,
            ProjectResponse,
            ValidationResultResponse,
            ProjectDetailResponse,
            DashboardSummary,
            RecentProject,
            DashboardResponse,
            HealthReport,
            HealthGrade,
            Recommendation,
            Priority,
            OutcomeStatus,
            ActivityEntry,
            TrendPoint,
            IssueShare,
            ProjectIssue,
            IssueLocation,
            Coordinates,
            IssueComment
        )
    ),
    tags(
        (name = "projects", description = "Model uploads and projects"),
        (name = "dashboard", description = "Dashboard data"),
        (name = "system", description = "System endpoints")
    )
)]
/// OpenAPI specification for the Sentry server.
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn openapi_includes_expected_paths() {
        let doc = ApiDoc::openapi();
        let paths = doc.paths.paths;

        assert!(paths.contains_key("/"));
        assert!(paths.contains_key("/api/health"));
        assert!(paths.contains_key("/api/upload"));
        assert!(paths.contains_key("/api/projects"));
        assert!(paths.contains_key("/api/projects/{id}"));
        assert!(paths.contains_key("/api/dashboard"));
        assert!(paths.contains_key("/api/issues/{id}"));
        assert!(paths.contains_key("/api/openapi.json"));
    }

    #[test]
    fn openapi_registers_health_report_schema() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.schemas.contains_key("HealthReport"));
        assert!(components.schemas.contains_key("ErrorResponse"));
    }
}
