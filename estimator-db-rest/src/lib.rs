//! Submission store backed by a PostgREST-style HTTP API (as exposed by
//! Supabase). Used as the secondary store when the primary database is
//! unreachable.

mod error;
mod repository;

pub use error::classify;
pub use repository::RestSubmissionRepository;
