mod seeder;

pub use seeder::{SeedError, SeedOutcome, SubmissionRecord, SubmissionSeeder};
