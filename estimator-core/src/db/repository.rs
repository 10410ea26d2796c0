use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewSubmission, Submission};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The store refused the operation (row-level security, missing grants).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The submissions table does not exist in the target store.
    #[error("Missing table: {0}")]
    MissingTable(String),
}

/// Persistence for estimate requests.
///
/// Implemented once per backend; the submission pipeline only talks to
/// stores through this trait.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Short name used in logs (e.g. `"sqlite"`, `"rest"`).
    fn name(&self) -> &str;

    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<Submission, RepositoryError>;

    async fn get_submission(
        &self,
        id: i64,
    ) -> Result<Submission, RepositoryError>;

    /// All submissions, newest first.
    async fn list_submissions(&self) -> Result<Vec<Submission>, RepositoryError>;

    async fn count_submissions(&self) -> Result<i64, RepositoryError>;

    /// Removes every submission and returns how many were deleted.
    async fn delete_all_submissions(&self) -> Result<u64, RepositoryError>;

    /// Verifies the submissions table is reachable before writing to it.
    async fn check_table(&self) -> Result<(), RepositoryError> {
        self.count_submissions().await.map(|_| ())
    }
}
