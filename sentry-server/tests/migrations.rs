//! Verifies the embedded migrations create and drop the project tables.

use std::fs;
use std::path::PathBuf;

fn migration_dir() -> PathBuf {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
    let mut dirs: Vec<PathBuf> = fs::read_dir(&root)
        .expect("read migrations directory")
        .map(|entry| entry.expect("migration entry").path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs.into_iter()
        .find(|path| path.to_string_lossy().ends_with("_create_projects"))
        .expect("create_projects migration")
}

fn read(name: &str) -> String {
    fs::read_to_string(migration_dir().join(name)).expect("read migration sql")
}

#[test]
fn up_creates_project_tables() {
    let up = read("up.sql");
    for table in ["CREATE TABLE projects", "CREATE TABLE validation_results"] {
        assert!(up.contains(table), "up.sql missing: {table}");
    }
    for column in ["health_score", "health_report", "critical_issues", "position"] {
        assert!(up.contains(column), "up.sql missing column: {column}");
    }
    assert!(up.contains("REFERENCES projects (id) ON DELETE CASCADE"));
}

#[test]
fn down_drops_tables_in_dependency_order() {
    let down = read("down.sql");
    let results = down
        .find("DROP TABLE IF EXISTS validation_results")
        .expect("drops validation_results");
    let projects = down
        .find("DROP TABLE IF EXISTS projects")
        .expect("drops projects");
    assert!(results < projects);
}
