//! Upload ingestion: store the model, record the project, run the analysis.

use std::fmt;
use std::path::Path;

use chrono::Utc;
use sentry_core::storage::display_name;
use sentry_core::{AnalysisPipeline, FileStore, RandomSource, SentryError};

use crate::models::{ProjectRecord, ProjectStatus, ProjectUpdate, ValidationResultRecord};
use crate::store::{ProjectStore, StoreError};

/// Failures that abort an upload.
#[derive(Debug)]
pub enum IngestError {
    /// The upload itself is unacceptable.
    Rejected(String),
    /// The model could not be written to upload storage.
    Storage(SentryError),
    /// The project could not be persisted.
    Store(StoreError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Rejected(message) => write!(f, "{message}"),
            IngestError::Storage(err) => write!(f, "failed to store upload: {err}"),
            IngestError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<StoreError> for IngestError {
    fn from(value: StoreError) -> Self {
        IngestError::Store(value)
    }
}

impl From<SentryError> for IngestError {
    fn from(value: SentryError) -> Self {
        match value {
            SentryError::InvalidInput(message) => IngestError::Rejected(message),
            other => IngestError::Storage(other),
        }
    }
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReceipt {
    /// New project id.
    pub project_id: String,
    /// Sanitised file name.
    pub filename: String,
    /// Stored size in bytes.
    pub file_size: u64,
    /// Final project status.
    pub status: ProjectStatus,
}

/// Runs the simulated analysis for uploaded models.
#[derive(Debug, Clone, Default)]
pub struct AnalysisService {
    pipeline: AnalysisPipeline,
}

impl AnalysisService {
    /// Store an uploaded model, create its project, and analyse it.
    ///
    /// Analysis failures do not fail the upload: the project is marked
    /// `Error` with a zero score instead.
    pub fn ingest<R: RandomSource + ?Sized>(
        &self,
        projects: &dyn ProjectStore,
        files: &(dyn FileStore + Send + Sync),
        filename: &str,
        source: &Path,
        rng: &mut R,
    ) -> Result<IngestReceipt, IngestError> {
        let stored = files.save(filename, source)?;
        let project = ProjectRecord::processing(
            display_name(&stored.filename),
            stored.filename.clone(),
            stored.path.to_string_lossy().to_string(),
            i64::try_from(stored.size).unwrap_or(i64::MAX),
            Utc::now().naive_utc(),
        );
        if let Err(err) = projects.insert_project(&project) {
            discard_upload(files, &stored.path);
            return Err(err.into());
        }
        log::info!(
            "stored upload {} ({} bytes) as project {}",
            stored.filename,
            stored.size,
            project.id
        );

        let outcome = self
            .pipeline
            .analyze_stored(files, &stored.filename, &stored.path, rng)
            .map_err(|err| err.to_string())
            .and_then(|analysis| {
                let update = ProjectUpdate::completed(&analysis.summary, &analysis.report);
                let rows = ValidationResultRecord::from_outcomes(
                    &project.id,
                    &analysis.outcomes,
                    Utc::now().naive_utc(),
                );
                projects
                    .record_analysis(&project.id, &update, &rows)
                    .map_err(|err| err.to_string())?;
                Ok(analysis)
            });

        let status = match outcome {
            Ok(analysis) => {
                log::info!(
                    "project {} scored {:.1} (grade {})",
                    project.id,
                    analysis.report.overall_score,
                    analysis.report.health_grade
                );
                ProjectStatus::Completed
            }
            Err(message) => {
                log::error!("processing error for project {}: {message}", project.id);
                projects.update_project(&project.id, &ProjectUpdate::failed())?;
                ProjectStatus::Error
            }
        };

        Ok(IngestReceipt {
            project_id: project.id,
            filename: stored.filename,
            file_size: stored.size,
            status,
        })
    }
}

fn discard_upload(files: &(dyn FileStore + Send + Sync), path: &Path) {
    match files.delete(path) {
        Ok(_) => log::warn!("discarded upload {} after a failed insert", path.display()),
        Err(err) => log::error!("failed to discard upload {}: {err}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryProjectStore;
    use sentry_core::storage::{FileInfo, StoredFile};
    use sentry_core::{LocalFileStore, Xorshift64};
    use std::path::PathBuf;

    /// Accepts every upload but reports it as gone when analysed.
    struct VanishingStore;

    impl FileStore for VanishingStore {
        fn save(&self, filename: &str, _source: &Path) -> sentry_core::Result<StoredFile> {
            Ok(StoredFile {
                filename: filename.to_string(),
                path: PathBuf::from("/nowhere").join(filename),
                size: 10,
            })
        }

        fn delete(&self, _path: &Path) -> sentry_core::Result<bool> {
            Ok(false)
        }

        fn file_info(&self, _path: &Path) -> sentry_core::Result<Option<FileInfo>> {
            Ok(None)
        }
    }

    /// Memory store that can be told to fail inserts or analysis writes.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryProjectStore,
        fail_insert: bool,
        fail_record: bool,
    }

    fn refused() -> StoreError {
        StoreError::Query(diesel::result::Error::RollbackTransaction)
    }

    impl ProjectStore for FlakyStore {
        fn ping(&self) -> crate::store::StoreResult<()> {
            self.inner.ping()
        }

        fn insert_project(&self, project: &ProjectRecord) -> crate::store::StoreResult<()> {
            if self.fail_insert {
                return Err(refused());
            }
            self.inner.insert_project(project)
        }

        fn update_project(
            &self,
            id: &str,
            update: &ProjectUpdate,
        ) -> crate::store::StoreResult<bool> {
            self.inner.update_project(id, update)
        }

        fn record_analysis(
            &self,
            id: &str,
            update: &ProjectUpdate,
            results: &[ValidationResultRecord],
        ) -> crate::store::StoreResult<()> {
            if self.fail_record {
                return Err(refused());
            }
            self.inner.record_analysis(id, update, results)
        }

        fn list_projects(&self, limit: Option<i64>) -> crate::store::StoreResult<Vec<ProjectRecord>> {
            self.inner.list_projects(limit)
        }

        fn find_project(&self, id: &str) -> crate::store::StoreResult<Option<ProjectRecord>> {
            self.inner.find_project(id)
        }

        fn validation_results(
            &self,
            project_id: &str,
        ) -> crate::store::StoreResult<Vec<ValidationResultRecord>> {
            self.inner.validation_results(project_id)
        }

        fn stats(&self) -> crate::store::StoreResult<crate::store::ProjectStats> {
            self.inner.stats()
        }
    }

    fn stored_models(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(root)
            .expect("read upload dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".ifc"))
            .collect();
        names.sort();
        names
    }

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sentry_ingest_{label}_{}", uuid::Uuid::new_v4().simple()))
    }

    #[test]
    fn ingest_completes_and_persists_results() {
        let root = temp_dir("ok");
        let files = LocalFileStore::new(&root).expect("store");
        let source = root.join("incoming.tmp");
        std::fs::write(&source, vec![b'x'; 4096]).expect("source");
        let projects = MemoryProjectStore::new();

        let receipt = AnalysisService::default()
            .ingest(&projects, &files, "Tower A.ifc", &source, &mut Xorshift64::new(9))
            .expect("ingest");

        assert_eq!(receipt.status, ProjectStatus::Completed);
        assert_eq!(receipt.filename, "Tower_A.ifc");
        assert_eq!(receipt.file_size, 4096);
        let project = projects
            .find_project(&receipt.project_id)
            .expect("find")
            .expect("exists");
        assert_eq!(project.name, "Tower_A");
        assert_eq!(project.status, "Completed");
        assert!(project.report().is_some());
        assert_eq!(
            projects
                .validation_results(&receipt.project_id)
                .expect("results")
                .len(),
            8
        );
        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn ingest_rejects_disallowed_extensions() {
        let root = temp_dir("reject");
        let files = LocalFileStore::new(&root).expect("store");
        let projects = MemoryProjectStore::new();

        let error = AnalysisService::default()
            .ingest(&projects, &files, "notes.txt", &root.join("missing"), &mut Xorshift64::new(1))
            .expect_err("rejected");

        assert!(matches!(error, IngestError::Rejected(_)));
        assert_eq!(
            error.to_string(),
            "File type not allowed. Please upload .ifc files only"
        );
        assert!(projects.list_projects(None).expect("list").is_empty());
        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn analysis_failure_marks_project_as_error() {
        let projects = MemoryProjectStore::new();

        let receipt = AnalysisService::default()
            .ingest(
                &projects,
                &VanishingStore,
                "Tower.ifc",
                Path::new("/tmp/unused"),
                &mut Xorshift64::new(2),
            )
            .expect("upload still succeeds");

        assert_eq!(receipt.status, ProjectStatus::Error);
        let project = projects
            .find_project(&receipt.project_id)
            .expect("find")
            .expect("exists");
        assert_eq!(project.status, "Error");
        assert_eq!(project.health_score, 0.0);
        assert!(
            projects
                .validation_results(&receipt.project_id)
                .expect("results")
                .is_empty()
        );
    }

    #[test]
    fn failed_analysis_write_marks_project_as_error() {
        let root = temp_dir("record");
        let files = LocalFileStore::new(&root).expect("store");
        let source = root.join("incoming.tmp");
        std::fs::write(&source, vec![b'x'; 4096]).expect("source");
        let projects = FlakyStore {
            fail_record: true,
            ..FlakyStore::default()
        };

        let receipt = AnalysisService::default()
            .ingest(&projects, &files, "Tower.ifc", &source, &mut Xorshift64::new(4))
            .expect("upload still succeeds");

        assert_eq!(receipt.status, ProjectStatus::Error);
        let project = projects
            .find_project(&receipt.project_id)
            .expect("find")
            .expect("exists");
        assert_eq!(project.status, "Error");
        assert_eq!(project.health_score, 0.0);
        assert!(project.report().is_none());
        assert_eq!(stored_models(&root).len(), 1);
        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn failed_insert_discards_stored_model() {
        let root = temp_dir("insert");
        let files = LocalFileStore::new(&root).expect("store");
        let source = root.join("incoming.tmp");
        std::fs::write(&source, b"ISO-10303-21;").expect("source");
        let projects = FlakyStore {
            fail_insert: true,
            ..FlakyStore::default()
        };

        let error = AnalysisService::default()
            .ingest(&projects, &files, "Tower.ifc", &source, &mut Xorshift64::new(4))
            .expect_err("insert fails");

        assert!(matches!(error, IngestError::Store(_)));
        assert!(stored_models(&root).is_empty());
        assert!(projects.list_projects(None).expect("list").is_empty());
        std::fs::remove_dir_all(&root).expect("cleanup");
    }
}
