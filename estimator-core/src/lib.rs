pub mod analytics;
pub mod config;
pub mod db;
pub mod models;
pub mod wizard;

pub use db::repository::{RepositoryError, SubmissionRepository};
pub use models::*;
