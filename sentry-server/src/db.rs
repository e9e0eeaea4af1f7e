//! Database connection pool utilities.

#[cfg(test)]
use diesel::RunQueryDsl;
use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::store::StoreError;

/// Pooled PostgreSQL connections for the Sentry server.
pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Embedded Diesel migrations.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Build a pool for `database_url` and bring the schema up to date.
pub fn init_pool(database_url: &str) -> Result<DbPool, StoreError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().build(manager)?;
    run_migrations(&pool)?;
    Ok(pool)
}

/// Run pending Diesel migrations.
pub fn run_migrations(pool: &DbPool) -> Result<(), StoreError> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| StoreError::Migration(err.to_string()))?;
    if !applied.is_empty() {
        log::info!("applied {} database migration(s)", applied.len());
    }
    Ok(())
}

/// Server and database parts of a connection string, keeping any query suffix.
#[cfg(test)]
fn split_database_url(database_url: &str) -> Option<(&str, &str)> {
    let (url_base, query) = match database_url.find('?') {
        Some(index) => database_url.split_at(index),
        None => (database_url, ""),
    };
    let (server, name) = url_base.rsplit_once('/')?;
    (!name.is_empty()).then_some((server, query))
}

/// Throwaway PostgreSQL database holding a migrated Sentry schema.
#[cfg(test)]
pub(crate) struct TestDatabase {
    admin_url: String,
    name: String,
    pool: DbPool,
}

#[cfg(test)]
impl TestDatabase {
    /// Create and migrate a fresh database next to `TEST_DATABASE_URL` (or `DATABASE_URL`).
    pub(crate) fn create() -> Self {
        use diesel::Connection;

        let base_url = std::env::var("TEST_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .expect("TEST_DATABASE_URL or DATABASE_URL for PostgreSQL tests");
        let (server, query) =
            split_database_url(&base_url).expect("database url names a database");
        let name = format!("sentry_test_{}", uuid::Uuid::new_v4().simple());
        let admin_url = format!("{server}/postgres{query}");

        let mut admin = PgConnection::establish(&admin_url).expect("connect admin database");
        diesel::sql_query(format!("CREATE DATABASE \"{name}\""))
            .execute(&mut admin)
            .expect("create test database");
        let pool = init_pool(&format!("{server}/{name}{query}")).expect("migrated pool");

        Self {
            admin_url,
            name,
            pool,
        }
    }

    /// Project store over the test database.
    pub(crate) fn store(&self) -> crate::store::PgProjectStore {
        crate::store::PgProjectStore::new(self.pool.clone())
    }

    /// Rows currently held in `table`.
    pub(crate) fn row_count(&self, table: &str) -> i64 {
        use diesel::sql_types::BigInt;

        #[derive(diesel::QueryableByName)]
        struct Count {
            #[diesel(sql_type = BigInt)]
            total: i64,
        }

        let mut conn = self.pool.get().expect("conn");
        diesel::sql_query(format!("SELECT COUNT(*) AS total FROM {table}"))
            .get_result::<Count>(&mut conn)
            .expect("count rows")
            .total
    }
}

#[cfg(test)]
impl Drop for TestDatabase {
    fn drop(&mut self) {
        use diesel::Connection;

        if let Ok(mut admin) = PgConnection::establish(&self.admin_url) {
            let _ = diesel::sql_query(format!(
                "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
                self.name
            ))
            .execute(&mut admin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TestDatabase, split_database_url};
    use crate::models::{ProjectRecord, ProjectUpdate};
    use crate::store::ProjectStore;

    #[test]
    fn split_database_url_keeps_query() {
        assert_eq!(
            split_database_url("postgres://u:p@db:5432/sentry?sslmode=disable"),
            Some(("postgres://u:p@db:5432", "?sslmode=disable"))
        );
        assert_eq!(
            split_database_url("postgres://localhost/sentry"),
            Some(("postgres://localhost", ""))
        );
        assert_eq!(split_database_url("postgres://localhost/"), None);
    }

    #[test]
    #[ignore = "requires PostgreSQL"]
    fn deleting_a_project_cascades_to_its_results() {
        use diesel::RunQueryDsl;

        let test_db = TestDatabase::create();
        assert_eq!(test_db.row_count("projects"), 0);

        let store = test_db.store();
        let project = ProjectRecord::processing(
            "Tower".to_string(),
            "Tower.ifc".to_string(),
            "/uploads/Tower.ifc".to_string(),
            2048,
            chrono::Utc::now().naive_utc(),
        );
        store.insert_project(&project).expect("insert");
        let outcomes = vec![sentry_core::ValidationOutcome::new(
            "Clash Detection",
            "Geometry",
            sentry_core::OutcomeStatus::Critical,
            2,
        )];
        let rows = crate::models::ValidationResultRecord::from_outcomes(
            &project.id,
            &outcomes,
            chrono::Utc::now().naive_utc(),
        );
        store
            .record_analysis(&project.id, &ProjectUpdate::failed(), &rows)
            .expect("record");
        assert_eq!(test_db.row_count("validation_results"), 1);

        let mut conn = test_db.pool.get().expect("conn");
        diesel::sql_query(format!("DELETE FROM projects WHERE id = '{}'", project.id))
            .execute(&mut conn)
            .expect("delete project");
        assert_eq!(test_db.row_count("validation_results"), 0);
    }
}
