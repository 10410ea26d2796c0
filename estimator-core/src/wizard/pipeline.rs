//! Turns a finished [`AnswerRecord`] into a stored submission.
//!
//! The primary store is tried first. Any error falls through to the
//! secondary store. A pipeline without a secondary store reports success
//! without saving, so local setups can run the wizard end to end.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::DEFAULT_TABLE;
use crate::db::{RepositoryError, SubmissionRepository};
use crate::models::{
    AnswerRecord, NewSubmission, ProductVariant, Submission, SubmissionResult,
};

pub const MISSING_CONTACT_MESSAGE: &str =
    "Please provide your name and email to submit the estimate request.";
pub const PRIMARY_SUCCESS_MESSAGE: &str =
    "Thank you! Your estimate request has been submitted. Our team will contact you shortly.";
pub const SECONDARY_SUCCESS_MESSAGE: &str = "Your estimate request has been submitted successfully!";
pub const UNCONFIGURED_MESSAGE: &str = "Your information has been received, but no database is configured so no record was saved.";

/// Builds the payload for `answers`.
///
/// Fence requests carry the categorical answers as their labels. Shower
/// requests leave the fence columns out and fold their answers into a
/// summary at the top of `project_details`.
pub fn map_answers_to_submission(
    variant: ProductVariant,
    answers: &AnswerRecord,
) -> NewSubmission {
    let zip_code = Some(answers.zip_code.trim().to_string()).filter(|z| !z.is_empty());

    let base = NewSubmission {
        full_name: answers.full_name.trim().to_string(),
        email: answers.email.trim().to_string(),
        phone: answers.phone.trim().to_string(),
        address: answers.address.trim().to_string(),
        zip_code,
        ..NewSubmission::default()
    };

    match variant {
        ProductVariant::Fence => NewSubmission {
            property_type: Some(answers.property_type.to_string()),
            service_type: Some(answers.service_type.to_string()),
            materials: answers.materials.iter().map(ToString::to_string).collect(),
            project_details: answers.project_details.clone(),
            ..base
        },
        ProductVariant::Shower => NewSubmission {
            project_details: shower_summary(answers),
            ..base
        },
    }
}

fn shower_summary(answers: &AnswerRecord) -> String {
    let issues = if answers.shower_issues.is_empty() {
        "None selected".to_string()
    } else {
        answers
            .shower_issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let bathtub = match answers.has_existing_bathtub {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "Not answered",
    };

    let mut summary = format!(
        "Project type: {}\nShower issues: {}\nWater heater: {}\nPlumbing condition: {}\nExisting bathtub: {}",
        answers.project_type,
        issues,
        answers.existing_water_heater,
        answers.plumbing_condition,
        bathtub,
    );

    let details = answers.project_details.trim();
    if !details.is_empty() {
        summary.push_str("\n\n");
        summary.push_str(details);
    }
    summary
}

/// Inner message of a repository error, without the variant prefix.
fn detail(err: &RepositoryError) -> String {
    match err {
        RepositoryError::NotFound => "record not found".to_string(),
        RepositoryError::Database(msg)
        | RepositoryError::Connection(msg)
        | RepositoryError::Configuration(msg)
        | RepositoryError::PermissionDenied(msg)
        | RepositoryError::MissingTable(msg) => msg.clone(),
    }
}

pub struct SubmissionPipeline {
    variant: ProductVariant,
    primary: Option<Arc<dyn SubmissionRepository>>,
    secondary: Option<Arc<dyn SubmissionRepository>>,
    preflight: bool,
    table: String,
}

impl SubmissionPipeline {
    /// A pipeline with no stores; every valid submission soft-succeeds.
    pub fn new(variant: ProductVariant) -> Self {
        Self {
            variant,
            primary: None,
            secondary: None,
            preflight: true,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    pub fn with_primary(
        mut self,
        repo: Arc<dyn SubmissionRepository>,
    ) -> Self {
        self.primary = Some(repo);
        self
    }

    pub fn with_secondary(
        mut self,
        repo: Arc<dyn SubmissionRepository>,
    ) -> Self {
        self.secondary = Some(repo);
        self
    }

    /// Whether the secondary store's table is checked before each insert.
    pub fn with_preflight(
        mut self,
        enabled: bool,
    ) -> Self {
        self.preflight = enabled;
        self
    }

    /// Table name used in remediation messages.
    pub fn with_table(
        mut self,
        table: impl Into<String>,
    ) -> Self {
        self.table = table.into();
        self
    }

    pub fn variant(&self) -> ProductVariant {
        self.variant
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    pub async fn submit(
        &self,
        answers: &AnswerRecord,
    ) -> SubmissionResult {
        if answers.full_name.trim().is_empty() || answers.email.trim().is_empty() {
            return SubmissionResult::failure(MISSING_CONTACT_MESSAGE);
        }

        let payload = map_answers_to_submission(self.variant, answers);

        if let Some(primary) = &self.primary {
            match primary.create_submission(payload.clone()).await {
                Ok(stored) => {
                    info!(store = primary.name(), id = stored.id, "submission stored");
                    return SubmissionResult::stored(PRIMARY_SUCCESS_MESSAGE, stored);
                }
                Err(e) => {
                    warn!(store = primary.name(), error = %e, "primary store failed; trying secondary");
                }
            }
        }

        let Some(secondary) = &self.secondary else {
            info!(
                payload = %serde_json::to_string(&payload).unwrap_or_default(),
                "secondary store not configured; submission not persisted"
            );
            return SubmissionResult::success(UNCONFIGURED_MESSAGE);
        };

        match self.write_secondary(secondary.as_ref(), payload).await {
            Ok(stored) => {
                info!(store = secondary.name(), id = stored.id, "submission stored");
                SubmissionResult::stored(SECONDARY_SUCCESS_MESSAGE, stored)
            }
            Err(e) => {
                error!(store = secondary.name(), error = %e, "secondary store failed");
                SubmissionResult::failure(self.failure_message(&e))
            }
        }
    }

    async fn write_secondary(
        &self,
        repo: &dyn SubmissionRepository,
        payload: NewSubmission,
    ) -> Result<Submission, RepositoryError> {
        if self.preflight {
            repo.check_table().await?;
        }
        repo.create_submission(payload).await
    }

    fn failure_message(
        &self,
        err: &RepositoryError,
    ) -> String {
        match err {
            RepositoryError::PermissionDenied(msg) => format!(
                "Database error: {msg}. A row-level security policy is preventing data insertion; \
                 grant insert access on \"{}\" and try again.",
                self.table
            ),
            RepositoryError::MissingTable(_) => format!(
                "The database table \"{}\" does not exist. Create it before accepting submissions.",
                self.table
            ),
            other => format!("Database operation failed: {}", detail(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{
        MaterialType, PropertyType, ProjectType, ServiceType, ShowerIssue, WaterHeaterType,
    };

    /// Fails every call with `error` when set, otherwise stores in memory.
    #[derive(Default)]
    struct FakeRepository {
        error: Option<RepositoryError>,
        count_error: Option<RepositoryError>,
        calls: AtomicUsize,
        saved: Mutex<Vec<NewSubmission>>,
    }

    impl FakeRepository {
        fn failing(error: RepositoryError) -> Self {
            Self {
                error: Some(error),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SubmissionRepository for FakeRepository {
        fn name(&self) -> &str {
            "fake"
        }

        async fn create_submission(
            &self,
            submission: NewSubmission,
        ) -> Result<Submission, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = &self.error {
                return Err(e.clone());
            }
            self.saved.lock().unwrap().push(submission.clone());
            Ok(Submission {
                id: 1,
                full_name: submission.full_name,
                email: submission.email,
                phone: submission.phone,
                address: submission.address,
                zip_code: submission.zip_code,
                property_type: submission.property_type,
                service_type: submission.service_type,
                materials: submission.materials,
                project_details: submission.project_details,
                created_at: Utc::now(),
            })
        }

        async fn get_submission(
            &self,
            _id: i64,
        ) -> Result<Submission, RepositoryError> {
            Err(RepositoryError::NotFound)
        }

        async fn list_submissions(&self) -> Result<Vec<Submission>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn count_submissions(&self) -> Result<i64, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.count_error {
                Some(e) => Err(e.clone()),
                None => Ok(0),
            }
        }

        async fn delete_all_submissions(&self) -> Result<u64, RepositoryError> {
            Ok(0)
        }
    }

    fn fence_answers() -> AnswerRecord {
        AnswerRecord {
            property_type: PropertyType::Residential,
            service_type: ServiceType::NewInstallation,
            materials: vec![MaterialType::Wood, MaterialType::ChainLink],
            project_details: "Backyard, about 150 feet".to_string(),
            full_name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            phone: "555-123-4567".to_string(),
            address: "123 Main St".to_string(),
            zip_code: "12345".to_string(),
            ..AnswerRecord::default()
        }
    }

    #[tokio::test]
    async fn missing_name_fails_without_store_calls() {
        let primary = Arc::new(FakeRepository::default());
        let secondary = Arc::new(FakeRepository::default());
        let pipeline = SubmissionPipeline::new(ProductVariant::Fence)
            .with_primary(primary.clone())
            .with_secondary(secondary.clone());

        let answers = AnswerRecord {
            full_name: String::new(),
            email: "a@b.com".to_string(),
            ..AnswerRecord::default()
        };
        let result = pipeline.submit(&answers).await;

        assert!(!result.success);
        assert!(result.message.contains("name and email"));
        assert_eq!(primary.calls(), 0);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn primary_success_short_circuits() {
        let primary = Arc::new(FakeRepository::default());
        let secondary = Arc::new(FakeRepository::default());
        let pipeline = SubmissionPipeline::new(ProductVariant::Fence)
            .with_primary(primary.clone())
            .with_secondary(secondary.clone());

        let result = pipeline.submit(&fence_answers()).await;

        assert!(result.success);
        assert_eq!(result.message, PRIMARY_SUCCESS_MESSAGE);
        assert_eq!(result.data.map(|s| s.full_name), Some("John Doe".to_string()));
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn primary_failure_falls_back_to_secondary() {
        let primary = Arc::new(FakeRepository::failing(RepositoryError::Connection(
            "refused".to_string(),
        )));
        let secondary = Arc::new(FakeRepository::default());
        let pipeline = SubmissionPipeline::new(ProductVariant::Fence)
            .with_primary(primary.clone())
            .with_secondary(secondary.clone());

        let result = pipeline.submit(&fence_answers()).await;

        assert!(result.success);
        assert_eq!(result.message, SECONDARY_SUCCESS_MESSAGE);
        assert_eq!(primary.calls(), 1);
        // pre-flight count plus the insert
        assert_eq!(secondary.calls(), 2);
    }

    #[tokio::test]
    async fn preflight_can_be_disabled() {
        let secondary = Arc::new(FakeRepository::default());
        let pipeline = SubmissionPipeline::new(ProductVariant::Fence)
            .with_secondary(secondary.clone())
            .with_preflight(false);

        assert!(pipeline.submit(&fence_answers()).await.success);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn unconfigured_secondary_soft_succeeds() {
        let primary = Arc::new(FakeRepository::failing(RepositoryError::Database(
            "boom".to_string(),
        )));
        let pipeline = SubmissionPipeline::new(ProductVariant::Fence).with_primary(primary);

        let result = pipeline.submit(&fence_answers()).await;

        assert!(result.success);
        assert_eq!(result.message, UNCONFIGURED_MESSAGE);
        assert_eq!(result.data, None);
    }

    #[tokio::test]
    async fn secondary_failures_are_classified() {
        let cases = [
            (
                RepositoryError::PermissionDenied("new row violates row-level security policy".to_string()),
                "row-level security",
            ),
            (
                RepositoryError::MissingTable("fence_estimator".to_string()),
                "\"fence_estimator\" does not exist",
            ),
            (
                RepositoryError::Database("value too long".to_string()),
                "Database operation failed: value too long",
            ),
        ];

        for (error, expected) in cases {
            let pipeline = SubmissionPipeline::new(ProductVariant::Fence)
                .with_secondary(Arc::new(FakeRepository::failing(error)));
            let result = pipeline.submit(&fence_answers()).await;

            assert!(!result.success);
            assert!(result.message.contains(expected), "{}", result.message);
        }
    }

    #[tokio::test]
    async fn preflight_failure_skips_insert() {
        let secondary = Arc::new(FakeRepository {
            count_error: Some(RepositoryError::MissingTable("shower_estimator".to_string())),
            ..FakeRepository::default()
        });
        let pipeline = SubmissionPipeline::new(ProductVariant::Shower)
            .with_secondary(secondary.clone())
            .with_table("shower_estimator");

        let result = pipeline.submit(&fence_answers()).await;

        assert!(!result.success);
        assert!(result.message.contains("shower_estimator"));
        assert!(secondary.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn fence_payload_uses_labels() {
        let payload = map_answers_to_submission(ProductVariant::Fence, &fence_answers());

        assert_eq!(payload.property_type.as_deref(), Some("Residential"));
        assert_eq!(payload.service_type.as_deref(), Some("New Installation"));
        assert_eq!(payload.materials, vec!["Wood".to_string(), "Chain Link".to_string()]);
        assert_eq!(payload.zip_code.as_deref(), Some("12345"));
    }

    #[test]
    fn shower_payload_summarises_answers() {
        let answers = AnswerRecord {
            project_type: ProjectType::TubToWalkInShower,
            shower_issues: vec![ShowerIssue::LackOfSpace, ShowerIssue::HighThreshold],
            existing_water_heater: WaterHeaterType::Tankless,
            has_existing_bathtub: Some(true),
            project_details: "Second floor bathroom".to_string(),
            full_name: "Robert Johnson".to_string(),
            email: "robert@example.com".to_string(),
            ..AnswerRecord::default()
        };

        let payload = map_answers_to_submission(ProductVariant::Shower, &answers);

        assert_eq!(payload.property_type, None);
        assert_eq!(payload.service_type, None);
        assert!(payload.materials.is_empty());
        assert_eq!(payload.zip_code, None);
        assert_eq!(
            payload.project_details,
            "Project type: Tub to walk-in shower\n\
             Shower issues: Lack of space, High threshold\n\
             Water heater: Tankless water heater\n\
             Plumbing condition: Not sure\n\
             Existing bathtub: Yes\n\
             \n\
             Second floor bathroom"
        );
    }
}
