use async_trait::async_trait;
use estimator_core::db::{DbConfig, RepositoryFactory};
use estimator_core::{RepositoryError, SubmissionRepository};

use crate::repository::SqliteSubmissionRepository;

/// Opens `sqlite` primary stores for a [`estimator_core::db::RepositoryRegistry`].
///
/// The connection string may be a `sqlite:` URL, a plain file path (the file
/// is created on first use) or `:memory:`. The schema is migrated before the
/// store is returned.
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn SubmissionRepository>, RepositoryError> {
        let store = SqliteSubmissionRepository::new(&config.connection_string).await?;
        store.run_migrations().await?;
        Ok(Box::new(store))
    }
}
