//! Project persistence behind a trait so handlers can run without PostgreSQL.

use std::fmt;

use diesel::dsl::{avg, sum};
use diesel::prelude::*;

use crate::db::DbPool;
use crate::models::{ProjectRecord, ProjectStatus, ProjectUpdate, ValidationResultRecord};
use crate::schema::{projects, validation_results};

/// Errors raised by a [`ProjectStore`].
#[derive(Debug)]
pub enum StoreError {
    /// No pooled connection was available.
    Pool(diesel::r2d2::PoolError),
    /// A query failed.
    Query(diesel::result::Error),
    /// Migrations could not be applied.
    Migration(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Pool(err) => write!(f, "database pool error: {err}"),
            StoreError::Query(err) => write!(f, "database query failed: {err}"),
            StoreError::Migration(message) => write!(f, "database migration failed: {message}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Pool(err) => Some(err),
            StoreError::Query(err) => Some(err),
            StoreError::Migration(_) => None,
        }
    }
}

impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(value: diesel::r2d2::PoolError) -> Self {
        StoreError::Pool(value)
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        StoreError::Query(value)
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Aggregates shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectStats {
    /// Number of projects.
    pub total: i64,
    /// Number of completed projects.
    pub completed: i64,
    /// Mean score over completed projects.
    pub average_score: f64,
    /// Sum of critical, warning, and info counts over completed projects.
    pub total_issues: i64,
}

/// Persistence seam for projects and their rule outcomes.
pub trait ProjectStore: Send + Sync {
    /// Check that the backing database answers.
    fn ping(&self) -> StoreResult<()>;
    /// Insert a new project.
    fn insert_project(&self, project: &ProjectRecord) -> StoreResult<()>;
    /// Overwrite analysis columns, returning whether the project exists.
    fn update_project(&self, id: &str, update: &ProjectUpdate) -> StoreResult<bool>;
    /// Write analysis columns and rule outcomes together.
    fn record_analysis(
        &self,
        id: &str,
        update: &ProjectUpdate,
        results: &[ValidationResultRecord],
    ) -> StoreResult<()>;
    /// Projects ordered newest first, optionally limited.
    fn list_projects(&self, limit: Option<i64>) -> StoreResult<Vec<ProjectRecord>>;
    /// Look up a project by id.
    fn find_project(&self, id: &str) -> StoreResult<Option<ProjectRecord>>;
    /// Rule outcomes of a project in evaluation order.
    fn validation_results(&self, project_id: &str) -> StoreResult<Vec<ValidationResultRecord>>;
    /// Dashboard aggregates.
    fn stats(&self) -> StoreResult<ProjectStats>;
}

/// PostgreSQL-backed project store.
#[derive(Clone)]
pub struct PgProjectStore {
    pool: DbPool,
}

impl PgProjectStore {
    /// Wrap a connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ProjectStore for PgProjectStore {
    fn ping(&self) -> StoreResult<()> {
        let mut conn = self.pool.get()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }

    fn insert_project(&self, project: &ProjectRecord) -> StoreResult<()> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(projects::table)
            .values(project)
            .execute(&mut conn)?;
        Ok(())
    }

    fn update_project(&self, id: &str, update: &ProjectUpdate) -> StoreResult<bool> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(projects::table.find(id))
            .set(update)
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    fn record_analysis(
        &self,
        id: &str,
        update: &ProjectUpdate,
        results: &[ValidationResultRecord],
    ) -> StoreResult<()> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::update(projects::table.find(id))
                .set(update)
                .execute(conn)?;
            if !results.is_empty() {
                diesel::insert_into(validation_results::table)
                    .values(results)
                    .execute(conn)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    fn list_projects(&self, limit: Option<i64>) -> StoreResult<Vec<ProjectRecord>> {
        let mut conn = self.pool.get()?;
        let mut query = projects::table
            .select(ProjectRecord::as_select())
            .order(projects::upload_date.desc())
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        Ok(query.load(&mut conn)?)
    }

    fn find_project(&self, id: &str) -> StoreResult<Option<ProjectRecord>> {
        let mut conn = self.pool.get()?;
        Ok(projects::table
            .find(id)
            .select(ProjectRecord::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn validation_results(&self, project_id: &str) -> StoreResult<Vec<ValidationResultRecord>> {
        let mut conn = self.pool.get()?;
        Ok(validation_results::table
            .filter(validation_results::project_id.eq(project_id))
            .order(validation_results::position.asc())
            .select(ValidationResultRecord::as_select())
            .load(&mut conn)?)
    }

    fn stats(&self) -> StoreResult<ProjectStats> {
        let mut conn = self.pool.get()?;
        let completed_status = ProjectStatus::Completed.as_str();
        let total: i64 = projects::table.count().get_result(&mut conn)?;
        let completed: i64 = projects::table
            .filter(projects::status.eq(completed_status))
            .count()
            .get_result(&mut conn)?;
        let average_score: Option<f64> = projects::table
            .filter(projects::status.eq(completed_status))
            .select(avg(projects::health_score))
            .get_result(&mut conn)?;
        let total_issues: Option<i64> = projects::table
            .filter(projects::status.eq(completed_status))
            .select(sum(
                projects::critical_issues + projects::warning_issues + projects::info_issues,
            ))
            .get_result(&mut conn)?;
        Ok(ProjectStats {
            total,
            completed,
            average_score: average_score.unwrap_or(0.0),
            total_issues: total_issues.unwrap_or(0),
        })
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory store used by handler tests.

    use std::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub(crate) struct MemoryProjectStore {
        projects: RwLock<Vec<ProjectRecord>>,
        results: RwLock<Vec<ValidationResultRecord>>,
    }

    impl MemoryProjectStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }
    }

    fn apply(project: &mut ProjectRecord, update: &ProjectUpdate) {
        project.status = update.status.clone();
        project.health_score = update.health_score;
        project.total_elements = update.total_elements;
        project.validated_elements = update.validated_elements;
        project.critical_issues = update.critical_issues;
        project.warning_issues = update.warning_issues;
        project.info_issues = update.info_issues;
        project.health_report = update.health_report.clone();
    }

    impl ProjectStore for MemoryProjectStore {
        fn ping(&self) -> StoreResult<()> {
            Ok(())
        }

        fn insert_project(&self, project: &ProjectRecord) -> StoreResult<()> {
            self.projects
                .write()
                .expect("projects lock")
                .push(project.clone());
            Ok(())
        }

        fn update_project(&self, id: &str, update: &ProjectUpdate) -> StoreResult<bool> {
            let mut projects = self.projects.write().expect("projects lock");
            match projects.iter_mut().find(|project| project.id == id) {
                Some(project) => {
                    apply(project, update);
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn record_analysis(
            &self,
            id: &str,
            update: &ProjectUpdate,
            results: &[ValidationResultRecord],
        ) -> StoreResult<()> {
            self.update_project(id, update)?;
            self.results
                .write()
                .expect("results lock")
                .extend_from_slice(results);
            Ok(())
        }

        fn list_projects(&self, limit: Option<i64>) -> StoreResult<Vec<ProjectRecord>> {
            let mut projects = self.projects.read().expect("projects lock").clone();
            projects.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
            if let Some(limit) = limit {
                projects.truncate(limit.max(0) as usize);
            }
            Ok(projects)
        }

        fn find_project(&self, id: &str) -> StoreResult<Option<ProjectRecord>> {
            Ok(self
                .projects
                .read()
                .expect("projects lock")
                .iter()
                .find(|project| project.id == id)
                .cloned())
        }

        fn validation_results(
            &self,
            project_id: &str,
        ) -> StoreResult<Vec<ValidationResultRecord>> {
            let mut results: Vec<ValidationResultRecord> = self
                .results
                .read()
                .expect("results lock")
                .iter()
                .filter(|result| result.project_id == project_id)
                .cloned()
                .collect();
            results.sort_by_key(|result| result.position);
            Ok(results)
        }

        fn stats(&self) -> StoreResult<ProjectStats> {
            let projects = self.projects.read().expect("projects lock");
            let completed: Vec<&ProjectRecord> = projects
                .iter()
                .filter(|project| project.status == ProjectStatus::Completed.as_str())
                .collect();
            let average_score = if completed.is_empty() {
                0.0
            } else {
                completed.iter().map(|p| p.health_score).sum::<f64>() / completed.len() as f64
            };
            Ok(ProjectStats {
                total: projects.len() as i64,
                completed: completed.len() as i64,
                average_score,
                total_issues: completed
                    .iter()
                    .map(|p| i64::from(p.critical_issues + p.warning_issues + p.info_issues))
                    .sum(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryProjectStore;
    use super::*;
    use crate::db::TestDatabase;
    use chrono::{Duration, NaiveDateTime};
    use sentry_core::{AnalysisPipeline, Xorshift64};

    fn base_time() -> NaiveDateTime {
        chrono::DateTime::parse_from_rfc3339("2024-05-31T12:00:00Z")
            .expect("timestamp")
            .naive_utc()
    }

    fn project(name: &str, minutes: i64) -> ProjectRecord {
        ProjectRecord::processing(
            name.to_string(),
            format!("{name}.ifc"),
            format!("/uploads/{name}.ifc"),
            1_048_576,
            base_time() + Duration::minutes(minutes),
        )
    }

    fn exercise_store(store: &dyn ProjectStore) {
        store.ping().expect("ping");
        let older = project("Older", 0);
        let newer = project("Newer", 5);
        let failed = project("Failed", 10);
        store.insert_project(&older).expect("insert older");
        store.insert_project(&newer).expect("insert newer");
        store.insert_project(&failed).expect("insert failed");

        let analysis = AnalysisPipeline::new()
            .analyze("Newer.ifc", 1_048_576, &mut Xorshift64::new(8))
            .expect("analysis");
        let update = ProjectUpdate::completed(&analysis.summary, &analysis.report);
        let rows = ValidationResultRecord::from_outcomes(&newer.id, &analysis.outcomes, base_time());
        store
            .record_analysis(&newer.id, &update, &rows)
            .expect("record analysis");
        assert!(
            store
                .update_project(&failed.id, &ProjectUpdate::failed())
                .expect("fail")
        );
        assert!(
            !store
                .update_project("missing", &ProjectUpdate::failed())
                .expect("missing")
        );

        let listed = store.list_projects(None).expect("list");
        let names: Vec<&str> = listed.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Failed", "Newer", "Older"]);
        assert_eq!(store.list_projects(Some(1)).expect("limit").len(), 1);

        let stored = store
            .find_project(&newer.id)
            .expect("find")
            .expect("exists");
        assert_eq!(stored.status, "Completed");
        assert_eq!(stored.report(), Some(analysis.report.clone()));
        assert!(store.find_project("missing").expect("find").is_none());

        let results = store.validation_results(&newer.id).expect("results");
        assert_eq!(results.len(), analysis.outcomes.len());
        assert_eq!(results[0].rule_name, analysis.outcomes[0].rule_name);

        let stats = store.stats().expect("stats");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert!((stats.average_score - analysis.report.overall_score).abs() < 1e-9);
        assert_eq!(
            stats.total_issues,
            i64::from(update.critical_issues + update.warning_issues + update.info_issues)
        );
    }

    #[test]
    fn memory_store_behaves_like_a_project_store() {
        exercise_store(&MemoryProjectStore::new());
    }

    #[test]
    fn empty_store_reports_zero_stats() {
        let stats = MemoryProjectStore::new().stats().expect("stats");
        assert_eq!(stats, ProjectStats::default());
    }

    #[test]
    #[ignore = "requires PostgreSQL"]
    fn postgres_store_behaves_like_a_project_store() {
        let test_db = TestDatabase::create();
        exercise_store(&test_db.store());
    }

    #[test]
    fn store_error_messages_name_the_failure() {
        let error = StoreError::from(diesel::result::Error::NotFound);
        assert!(error.to_string().starts_with("database query failed"));
        let error = StoreError::Migration("bad sql".to_string());
        assert_eq!(error.to_string(), "database migration failed: bad sql");
    }
}
