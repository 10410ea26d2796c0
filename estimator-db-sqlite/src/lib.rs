mod factory;
mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::{SqliteSubmissionRepository, TABLE_NAME, sqlite_url};
