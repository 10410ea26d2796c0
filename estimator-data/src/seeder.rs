use std::io::Read;

use estimator_core::{NewSubmission, RepositoryError, SubmissionRepository};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Separator between material labels inside the `materials` column.
const MATERIAL_SEPARATOR: char = ';';

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for SeedError {
    fn from(err: csv::Error) -> Self {
        SeedError::CsvParse(err.to_string())
    }
}

/// A single row of the sample-submissions CSV.
///
/// Empty cells in the optional columns stay absent in the stored row, so
/// shower-style leads can sit next to fence leads in the same file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub service_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_materials")]
    pub materials: Vec<String>,
    #[serde(default)]
    pub project_details: String,
}

fn deserialize_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

fn deserialize_materials<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| {
        s.split(MATERIAL_SEPARATOR)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default())
}

impl From<SubmissionRecord> for NewSubmission {
    fn from(record: SubmissionRecord) -> Self {
        NewSubmission {
            full_name: record.full_name,
            email: record.email,
            phone: record.phone,
            address: record.address,
            zip_code: record.zip_code,
            property_type: record.property_type,
            service_type: record.service_type,
            materials: record.materials,
            project_details: record.project_details,
        }
    }
}

/// What [`SubmissionSeeder::load`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store already held rows and `replace` was not requested.
    Skipped { existing: i64 },
    Loaded { removed: u64, inserted: usize },
}

/// Loads sample submissions from CSV into any [`SubmissionRepository`].
pub struct SubmissionSeeder;

impl SubmissionSeeder {
    /// Parse submission records from a CSV reader with a header row.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<SubmissionRecord>, SeedError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for (index, result) in csv_reader.deserialize().enumerate() {
            let record: SubmissionRecord = result?;
            // Header is line 1.
            let row = index + 2;
            if record.full_name.trim().is_empty() {
                return Err(SeedError::InvalidRecord {
                    row,
                    message: "full_name is empty".to_string(),
                });
            }
            if record.email.trim().is_empty() {
                return Err(SeedError::InvalidRecord {
                    row,
                    message: "email is empty".to_string(),
                });
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Insert `records` unless the store already has data.
    ///
    /// With `replace` set, existing rows are deleted first; otherwise a
    /// non-empty store is left untouched and [`SeedOutcome::Skipped`] is
    /// returned.
    pub async fn load<R>(
        repo: &R,
        records: &[SubmissionRecord],
        replace: bool,
    ) -> Result<SeedOutcome, SeedError>
    where
        R: SubmissionRepository + ?Sized,
    {
        let existing = repo.count_submissions().await?;
        let mut removed = 0;

        if existing > 0 {
            if !replace {
                info!(existing, "store already has submissions; skipping seed");
                return Ok(SeedOutcome::Skipped { existing });
            }
            removed = repo.delete_all_submissions().await?;
            info!(removed, "existing submissions deleted");
        }

        for record in records {
            let stored = repo.create_submission(record.clone().into()).await?;
            debug!(id = stored.id, name = %stored.full_name, "seeded submission");
        }

        Ok(SeedOutcome::Loaded {
            removed,
            inserted: records.len(),
        })
    }
}
