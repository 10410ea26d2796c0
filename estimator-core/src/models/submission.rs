use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored estimate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub zip_code: Option<String>,
    pub property_type: Option<String>,
    pub service_type: Option<String>,
    #[serde(default)]
    pub materials: Vec<String>,
    pub project_details: String,
    pub created_at: DateTime<Utc>,
}

/// For creating new submissions (no id or timestamp; the store assigns both).
///
/// Optional fields are left out of the serialized payload when absent, so a
/// shower-estimator request never carries fence-only columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<String>,
    pub project_details: String,
}

/// Outcome of one submission attempt, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Submission>,
}

impl SubmissionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn stored(
        message: impl Into<String>,
        submission: Submission,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(submission),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
