use async_trait::async_trait;
use chrono::{DateTime, Utc};
use estimator_core::{NewSubmission, RepositoryError, Submission, SubmissionRepository};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::debug;

pub const TABLE_NAME: &str = "fence_estimator";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Turns a `DATABASE_URL`-style value into a sqlx SQLite URL.
///
/// * `sqlite:...` is passed through.
/// * `:memory:` becomes `sqlite::memory:`.
/// * Anything else is a file path, created on first use.
pub fn sqlite_url(connection_string: &str) -> String {
    let trimmed = connection_string.trim();
    if trimmed.starts_with("sqlite:") {
        trimmed.to_string()
    } else if trimmed == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite:{trimmed}?mode=rwc")
    }
}

pub struct SqliteSubmissionRepository {
    pool: SqlitePool,
}

impl SqliteSubmissionRepository {
    pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
        let url = sqlite_url(database_url);

        // Every connection to `:memory:` opens a separate database.
        let options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = options
            .connect(&url)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{url}: {e}")))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection(e.to_string())
        }
        other => {
            let message = other.to_string();
            if message.contains("no such table") {
                RepositoryError::MissingTable(TABLE_NAME.to_string())
            } else {
                RepositoryError::Database(message)
            }
        }
    }
}

#[derive(FromRow)]
struct SubmissionRow {
    id: i64,
    full_name: String,
    email: String,
    phone: String,
    address: String,
    zip_code: Option<String>,
    property_type: Option<String>,
    service_type: Option<String>,
    materials: String,
    project_details: String,
    created_at: String,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = RepositoryError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        let materials: Vec<String> = serde_json::from_str(&row.materials).map_err(|e| {
            RepositoryError::Database(format!("Failed to parse materials '{}': {}", row.materials, e))
        })?;

        Ok(Submission {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            zip_code: row.zip_code,
            property_type: row.property_type,
            service_type: row.service_type,
            materials,
            project_details: row.project_details,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    chrono::NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| RepositoryError::Database(format!("Failed to parse datetime '{}': {}", s, e)))
}

#[async_trait]
impl SubmissionRepository for SqliteSubmissionRepository {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<Submission, RepositoryError> {
        let now = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let materials = serde_json::to_string(&submission.materials)
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO fence_estimator (
                full_name, email, phone, address, zip_code,
                property_type, service_type, materials, project_details, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&submission.full_name)
        .bind(&submission.email)
        .bind(&submission.phone)
        .bind(&submission.address)
        .bind(&submission.zip_code)
        .bind(&submission.property_type)
        .bind(&submission.service_type)
        .bind(&materials)
        .bind(&submission.project_details)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let id = result.last_insert_rowid();
        debug!(id, "submission inserted");
        self.get_submission(id).await
    }

    async fn get_submission(
        &self,
        id: i64,
    ) -> Result<Submission, RepositoryError> {
        let row: SubmissionRow = sqlx::query_as(
            "SELECT id, full_name, email, phone, address, zip_code,
                    property_type, service_type, materials, project_details, created_at
             FROM fence_estimator WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn list_submissions(&self) -> Result<Vec<Submission>, RepositoryError> {
        let rows: Vec<SubmissionRow> = sqlx::query_as(
            "SELECT id, full_name, email, phone, address, zip_code,
                    property_type, service_type, materials, project_details, created_at
             FROM fence_estimator ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn count_submissions(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM fence_estimator")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count)
    }

    async fn delete_all_submissions(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM fence_estimator")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    async fn setup_test_db() -> SqliteSubmissionRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteSubmissionRepository::new_with_pool(pool).await;
        repo.run_migrations().await.expect("Failed to run migrations");
        repo
    }

    fn fence_request() -> NewSubmission {
        NewSubmission {
            full_name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            phone: "555-123-4567".to_string(),
            address: "123 Main St".to_string(),
            zip_code: Some("12345".to_string()),
            property_type: Some("Residential".to_string()),
            service_type: Some("New Installation".to_string()),
            materials: vec!["Wood".to_string(), "Chain Link".to_string()],
            project_details: "Backyard fence, about 150 feet".to_string(),
        }
    }

    #[test]
    fn sqlite_url_accepts_paths_and_urls() {
        assert_eq!(sqlite_url("sqlite:estimates.db"), "sqlite:estimates.db");
        assert_eq!(sqlite_url(":memory:"), "sqlite::memory:");
        assert_eq!(sqlite_url("data/estimates.db"), "sqlite:data/estimates.db?mode=rwc");
    }

    #[tokio::test]
    async fn test_create_and_get_submission() {
        let repo = setup_test_db().await;

        let created = repo
            .create_submission(fence_request())
            .await
            .expect("Should create submission");

        assert!(created.id > 0);
        assert_eq!(created.materials, vec!["Wood".to_string(), "Chain Link".to_string()]);
        assert_eq!(created.zip_code.as_deref(), Some("12345"));

        let fetched = repo.get_submission(created.id).await.expect("Should fetch submission");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_shower_request_leaves_fence_columns_null() {
        let repo = setup_test_db().await;

        let created = repo
            .create_submission(NewSubmission {
                full_name: "Robert Johnson".to_string(),
                email: "robert@example.com".to_string(),
                project_details: "Project type: Tub to walk-in shower".to_string(),
                ..NewSubmission::default()
            })
            .await
            .expect("Should create submission");

        assert_eq!(created.property_type, None);
        assert_eq!(created.service_type, None);
        assert!(created.materials.is_empty());
    }

    #[tokio::test]
    async fn test_get_submission_not_found() {
        let repo = setup_test_db().await;

        let result = repo.get_submission(999).await;

        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let repo = setup_test_db().await;

        let first = repo.create_submission(fence_request()).await.unwrap();
        let second = repo
            .create_submission(NewSubmission {
                full_name: "Jane Smith".to_string(),
                ..fence_request()
            })
            .await
            .unwrap();

        let listed = repo.list_submissions().await.expect("Should list submissions");
        let ids: Vec<i64> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_count_and_delete_all() {
        let repo = setup_test_db().await;
        repo.create_submission(fence_request()).await.unwrap();
        repo.create_submission(fence_request()).await.unwrap();

        assert_eq!(repo.count_submissions().await.unwrap(), 2);
        assert_eq!(repo.delete_all_submissions().await.unwrap(), 2);
        assert_eq!(repo.count_submissions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_table_is_reported() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        let repo = SqliteSubmissionRepository::new_with_pool(pool).await;

        assert_eq!(
            repo.check_table().await,
            Err(RepositoryError::MissingTable(TABLE_NAME.to_string()))
        );
        assert_eq!(
            repo.create_submission(fence_request()).await.err(),
            Some(RepositoryError::MissingTable(TABLE_NAME.to_string()))
        );
    }
}
