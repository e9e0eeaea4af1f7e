//! Storage abstractions for uploaded model files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SentryError};

/// File extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["ifc", "IFC"];

/// A file persisted by a [`FileStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Sanitised name supplied by the uploader.
    pub filename: String,
    /// Location of the stored copy.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// Metadata about a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File name of the stored copy.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<DateTime<Utc>>,
}

/// Abstraction over upload storage for testability.
#[cfg_attr(test, mockall::automock)]
pub trait FileStore {
    /// Copy `source` into the store under a unique name derived from `filename`.
    fn save(&self, filename: &str, source: &Path) -> Result<StoredFile>;
    /// Delete a stored file, returning whether anything was removed.
    fn delete(&self, path: &Path) -> Result<bool>;
    /// Look up metadata for a stored file.
    fn file_info(&self, path: &Path) -> Result<Option<FileInfo>>;
}

/// Filesystem-backed store rooted at an upload directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Upload directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileStore for LocalFileStore {
    fn save(&self, filename: &str, source: &Path) -> Result<StoredFile> {
        let filename = sanitize_filename(filename);
        if !allowed_file(&filename) {
            return Err(SentryError::InvalidInput(
                "File type not allowed. Please upload .ifc files only".to_string(),
            ));
        }
        let path = self.root.join(unique_name(&filename));
        let size = std::fs::copy(source, &path)?;
        Ok(StoredFile {
            filename,
            path,
            size,
        })
    }

    fn delete(&self, path: &Path) -> Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn file_info(&self, path: &Path) -> Result<Option<FileInfo>> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(FileInfo {
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        }))
    }
}

/// Whether a file name carries an accepted extension.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext))
}

/// Strip directory components and replace characters unsafe in file names.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_matches(|ch| ch == '.' || ch == '_').to_string()
}

/// Project display name: the file name without its model extension.
pub fn display_name(filename: &str) -> String {
    filename.replace(".ifc", "").replace(".IFC", "")
}

fn unique_name(filename: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{filename}_{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        std::env::temp_dir().join(format!("sentry_core_store_{nanos}"))
    }

    #[test]
    fn allowed_file_checks_extension() {
        assert!(allowed_file("tower.ifc"));
        assert!(allowed_file("TOWER.IFC"));
        assert!(!allowed_file("tower.Ifc"));
        assert!(!allowed_file("tower.rvt"));
        assert!(!allowed_file("ifc"));
    }

    #[test]
    fn sanitize_strips_paths_and_unsafe_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\models\\My Tower.ifc"), "My_Tower.ifc");
        assert_eq!(sanitize_filename("..hidden.ifc"), "hidden.ifc");
    }

    #[test]
    fn display_name_drops_extension() {
        assert_eq!(display_name("Tower_A.ifc"), "Tower_A");
        assert_eq!(display_name("Tower_A.IFC"), "Tower_A");
    }

    #[test]
    fn local_store_saves_inspects_and_deletes() {
        let root = temp_root();
        let store = LocalFileStore::new(&root).expect("store");
        let source = root.join("incoming.tmp");
        std::fs::write(&source, b"ISO-10303-21;").expect("write source");

        let stored = store.save("site/Tower A.ifc", &source).expect("save");
        assert_eq!(stored.filename, "Tower_A.ifc");
        assert_eq!(stored.size, 13);
        let stored_name = stored
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("name");
        assert!(stored_name.starts_with("Tower_A_"));
        assert!(stored_name.ends_with(".ifc"));
        assert_eq!(stored_name.len(), "Tower_A_".len() + 8 + ".ifc".len());

        let info = store.file_info(&stored.path).expect("info").expect("exists");
        assert_eq!(info.size, 13);

        assert!(store.delete(&stored.path).expect("delete"));
        assert!(!store.delete(&stored.path).expect("delete again"));
        assert_eq!(store.file_info(&stored.path).expect("info"), None);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn local_store_rejects_disallowed_extensions() {
        let root = temp_root();
        let store = LocalFileStore::new(&root).expect("store");
        let error = store
            .save("notes.txt", &root.join("missing"))
            .expect_err("rejected");
        assert!(matches!(error, SentryError::InvalidInput(_)));
        std::fs::remove_dir_all(&root).expect("cleanup");
    }
}
