use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use estimator_core::config::EstimatorConfig;
use estimator_core::db::{DbConfig, RepositoryRegistry};
use estimator_core::wizard::{StepSequence, StepValidator, SubmissionPipeline, ValidationError};
use estimator_core::{AnswerRecord, ProductVariant, RepositoryError, StepId, SubmissionRepository};
use estimator_db_rest::RestSubmissionRepository;
use estimator_db_sqlite::SqliteRepositoryFactory;
use tracing::{debug, warn};

/// Returns a registry with every compiled-in primary backend registered.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// The stores a session can write to. Either may be absent.
#[derive(Clone, Default)]
pub struct Stores {
    pub primary: Option<Arc<dyn SubmissionRepository>>,
    pub secondary: Option<Arc<dyn SubmissionRepository>>,
}

impl Stores {
    /// Opens whatever `config` names.
    ///
    /// A primary store that cannot be opened is logged and left out so that
    /// submissions still reach the secondary store. A malformed secondary
    /// configuration is an error.
    pub async fn open(config: &EstimatorConfig) -> Result<Self> {
        let primary = match &config.database_url {
            Some(url) => {
                let db_config = DbConfig::from_url(url);
                debug!(backend = %db_config.backend, "opening primary store");
                match build_registry().create(&db_config).await {
                    Ok(repo) => Some(Arc::from(repo)),
                    Err(e) => {
                        warn!(error = %e, "primary store unavailable; continuing without it");
                        None
                    }
                }
            }
            None => None,
        };

        let secondary = match &config.rest {
            Some(credentials) => {
                let repo = RestSubmissionRepository::from_credentials(credentials, &config.table)
                    .context("Failed to configure secondary store")?;
                debug!(endpoint = repo.endpoint(), "secondary store configured");
                Some(Arc::new(repo) as Arc<dyn SubmissionRepository>)
            }
            None => None,
        };

        Ok(Self { primary, secondary })
    }

    pub fn pipeline(
        &self,
        config: &EstimatorConfig,
        preflight: bool,
    ) -> SubmissionPipeline {
        let mut pipeline = SubmissionPipeline::new(config.variant)
            .with_table(config.table.clone())
            .with_preflight(preflight);
        if let Some(primary) = &self.primary {
            pipeline = pipeline.with_primary(Arc::clone(primary));
        }
        if let Some(secondary) = &self.secondary {
            pipeline = pipeline.with_secondary(Arc::clone(secondary));
        }
        pipeline
    }

    /// Checks every configured store's table and counts its rows.
    pub async fn check(&self) -> Vec<StoreCheck> {
        let mut checks = Vec::new();
        for (role, store) in [("primary", &self.primary), ("secondary", &self.secondary)] {
            let Some(store) = store else {
                checks.push(StoreCheck {
                    role,
                    backend: None,
                    outcome: Ok(None),
                });
                continue;
            };

            let outcome = match store.check_table().await {
                Ok(()) => store.count_submissions().await.map(Some),
                Err(e) => Err(e),
            };
            checks.push(StoreCheck {
                role,
                backend: Some(store.name().to_string()),
                outcome,
            });
        }
        checks
    }
}

/// Result of probing one store. `outcome` is `Ok(None)` when the store is
/// not configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCheck {
    pub role: &'static str,
    pub backend: Option<String>,
    pub outcome: Result<Option<i64>, RepositoryError>,
}

impl StoreCheck {
    pub fn is_healthy(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn describe(&self) -> String {
        match (&self.backend, &self.outcome) {
            (None, _) => format!("{:<9} not configured", self.role),
            (Some(backend), Ok(Some(rows))) => {
                format!("{:<9} {backend}: ok ({rows} submissions)", self.role)
            }
            (Some(backend), Ok(None)) => format!("{:<9} {backend}: ok", self.role),
            (Some(backend), Err(e)) => format!("{:<9} {backend}: {e}", self.role),
        }
    }
}

/// Reads an answer file. Keys use the same camelCase names as the wizard;
/// anything left out keeps its default.
pub fn load_answers(path: &Path) -> Result<AnswerRecord> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answers: {}", path.display()))?;
    parse_answers(&text).with_context(|| format!("Failed to parse answers: {}", path.display()))
}

pub fn parse_answers(text: &str) -> Result<AnswerRecord> {
    Ok(toml::from_str(text)?)
}

/// Validates every step of `sequence`, in order, against `answers`.
pub fn validate_all(
    variant: ProductVariant,
    sequence: &StepSequence,
    answers: &AnswerRecord,
) -> Vec<(StepId, ValidationError)> {
    let validator = StepValidator::new(variant);
    sequence
        .as_slice()
        .iter()
        .flat_map(|step| {
            validator
                .validate(*step, answers)
                .into_iter()
                .map(move |error| (*step, error))
        })
        .collect()
}
