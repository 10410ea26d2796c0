//! Step table and step-order resolution.
//!
//! Each registered step has a [`StepDef`]: the title shown above it and the
//! field rules checked before the wizard may leave it. The order of steps
//! comes from configuration, validated against the variant's registry, and
//! falls back to the variant default when the configuration is unusable.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{ProductVariant, StepId};

use super::validator::{self, FieldRule};

/// Why a configured step order was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("no steps defined")]
    Empty,

    #[error("unknown step '{0}'")]
    UnknownStep(String),

    #[error("step '{0}' is not available in the {1} estimator")]
    UnregisteredStep(StepId, ProductVariant),

    #[error("step '{0}' appears more than once")]
    DuplicateStep(StepId),

    #[error("required step '{0}' is missing")]
    MissingStep(StepId),

    #[error("steps '{0}' and '{1}' collect the same answers; pick one")]
    ConflictingSteps(StepId, StepId),
}

/// Ordered, immutable list of steps for one session.
///
/// Cloning is cheap; every clone shares the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSequence {
    steps: Arc<[StepId]>,
}

impl StepSequence {
    fn new(steps: Vec<StepId>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(
        &self,
        index: usize,
    ) -> Option<StepId> {
        self.steps.get(index).copied()
    }

    pub fn as_slice(&self) -> &[StepId] {
        &self.steps
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn position(
        &self,
        step: StepId,
    ) -> Option<usize> {
        self.steps.iter().position(|s| *s == step)
    }

    /// Clamps `index` to the last valid position.
    pub fn clamp_index(
        &self,
        index: usize,
    ) -> usize {
        index.min(self.last_index())
    }
}

impl fmt::Display for StepSequence {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let ids: Vec<&str> = self.steps.iter().map(StepId::as_str).collect();
        f.write_str(&ids.join(","))
    }
}

/// Title and validation rules for one step.
#[derive(Debug)]
pub struct StepDef {
    pub id: StepId,
    pub title: &'static str,
    pub rules: &'static [FieldRule],
}

static PROPERTY_TYPE: StepDef = StepDef {
    id: StepId::PropertyType,
    title: "What is the property type?",
    rules: validator::PROPERTY_TYPE_RULES,
};

static SERVICE_TYPE: StepDef = StepDef {
    id: StepId::ServiceType,
    title: "What type of service do you need?",
    rules: validator::SERVICE_TYPE_RULES,
};

static MATERIALS: StepDef = StepDef {
    id: StepId::Materials,
    title: "Which fence materials are you interested in?",
    rules: validator::MATERIALS_RULES,
};

static PROJECT_DETAILS: StepDef = StepDef {
    id: StepId::ProjectDetails,
    title: "Tell us about your project",
    rules: validator::PROJECT_DETAILS_RULES,
};

static CONTACT_INFO: StepDef = StepDef {
    id: StepId::ContactInfo,
    title: "How can we reach you?",
    rules: validator::CONTACT_INFO_RULES,
};

static SHOWER_CONTACT_INFO: StepDef = StepDef {
    id: StepId::ContactInfo,
    title: "Who should we send your estimate to?",
    rules: validator::USER_INFO_RULES,
};

static USER_INFO: StepDef = StepDef {
    id: StepId::UserInfo,
    title: "Who should we send your estimate to?",
    rules: validator::USER_INFO_RULES,
};

static PROJECT_TYPE: StepDef = StepDef {
    id: StepId::ProjectType,
    title: "What type of project is this?",
    rules: &[],
};

static SHOWER_ISSUES: StepDef = StepDef {
    id: StepId::ShowerIssues,
    title: "Are there issues with the current shower/tub?",
    rules: validator::SHOWER_ISSUES_RULES,
};

static WATER_HEATER: StepDef = StepDef {
    id: StepId::WaterHeater,
    title: "What type of water heater do you have?",
    rules: &[],
};

static PLUMBING_CONDITION: StepDef = StepDef {
    id: StepId::PlumbingCondition,
    title: "What condition is your plumbing in?",
    rules: &[],
};

static EXISTING_BATHTUB: StepDef = StepDef {
    id: StepId::ExistingBathtub,
    title: "Do you have an existing bathtub?",
    rules: validator::EXISTING_BATHTUB_RULES,
};

static ZIP_CODE: StepDef = StepDef {
    id: StepId::ZipCode,
    title: "What is the ZIP code of the project?",
    rules: validator::ZIP_CODE_RULES,
};

/// Alternative fence orders selectable by name.
const FENCE_PRESETS: &[(&str, &[StepId])] = &[
    (
        "default",
        &[
            StepId::PropertyType,
            StepId::ServiceType,
            StepId::Materials,
            StepId::ProjectDetails,
            StepId::ContactInfo,
        ],
    ),
    (
        "contact-first",
        &[
            StepId::ContactInfo,
            StepId::PropertyType,
            StepId::ServiceType,
            StepId::Materials,
            StepId::ProjectDetails,
        ],
    ),
    (
        "technical-first",
        &[
            StepId::ServiceType,
            StepId::Materials,
            StepId::PropertyType,
            StepId::ProjectDetails,
            StepId::ContactInfo,
        ],
    ),
];

/// Step table for one product variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepRegistry {
    variant: ProductVariant,
}

impl StepRegistry {
    pub fn new(variant: ProductVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> ProductVariant {
        self.variant
    }

    pub fn default_sequence(&self) -> StepSequence {
        StepSequence::new(self.variant.default_order().to_vec())
    }

    /// The definition registered for `step`, or `None` when the step is not part of
    /// this variant.
    pub fn definition(
        &self,
        step: StepId,
    ) -> Option<&'static StepDef> {
        if !self.variant.registered_steps().contains(&step) {
            return None;
        }

        let def = match (self.variant, step) {
            (_, StepId::PropertyType) => &PROPERTY_TYPE,
            (_, StepId::ServiceType) => &SERVICE_TYPE,
            (_, StepId::Materials) => &MATERIALS,
            (_, StepId::ProjectDetails) => &PROJECT_DETAILS,
            (ProductVariant::Shower, StepId::ContactInfo) => &SHOWER_CONTACT_INFO,
            (_, StepId::ContactInfo) => &CONTACT_INFO,
            (_, StepId::UserInfo) => &USER_INFO,
            (_, StepId::ProjectType) => &PROJECT_TYPE,
            (_, StepId::ShowerIssues) => &SHOWER_ISSUES,
            (_, StepId::WaterHeater) => &WATER_HEATER,
            (_, StepId::PlumbingCondition) => &PLUMBING_CONDITION,
            (_, StepId::ExistingBathtub) => &EXISTING_BATHTUB,
            (_, StepId::ZipCode) => &ZIP_CODE,
        };
        Some(def)
    }

    /// Title shown for `step`, falling back to its identifier.
    pub fn title(
        &self,
        step: StepId,
    ) -> &'static str {
        self.definition(step).map_or(step.as_str(), |def| def.title)
    }

    /// Parses a comma-separated order and checks it against this registry.
    pub fn parse_order(
        &self,
        raw: &str,
    ) -> Result<StepSequence, SequenceError> {
        let registered = self.variant.registered_steps();
        let mut seen = HashSet::new();
        let mut steps = Vec::new();

        if raw.trim().is_empty() {
            return Err(SequenceError::Empty);
        }

        for token in raw.split(',').map(str::trim) {
            let step =
                StepId::parse(token).ok_or_else(|| SequenceError::UnknownStep(token.to_string()))?;
            if !registered.contains(&step) {
                return Err(SequenceError::UnregisteredStep(step, self.variant));
            }
            if !seen.insert(step) {
                return Err(SequenceError::DuplicateStep(step));
            }
            steps.push(step);
        }

        let required = if self.variant.requires_full_permutation() {
            registered
        } else {
            self.variant.default_order()
        };
        let missing = required.iter().find(|step| {
            !seen.contains(*step)
                && !(**step == StepId::ContactInfo && seen.contains(&StepId::UserInfo))
        });
        if let Some(missing) = missing {
            return Err(SequenceError::MissingStep(*missing));
        }
        if seen.contains(&StepId::ContactInfo) && seen.contains(&StepId::UserInfo) {
            return Err(SequenceError::ConflictingSteps(StepId::ContactInfo, StepId::UserInfo));
        }

        Ok(StepSequence::new(steps))
    }

    /// Resolves the session's step order from raw configuration.
    ///
    /// Absent configuration yields the default silently; rejected
    /// configuration yields the default with a warning.
    pub fn resolve(
        &self,
        raw_config: Option<&str>,
    ) -> StepSequence {
        let Some(raw) = raw_config.filter(|raw| !raw.trim().is_empty()) else {
            debug!(variant = %self.variant, "no step order configured; using default");
            return self.default_sequence();
        };

        match self.parse_order(raw) {
            Ok(sequence) => {
                debug!(variant = %self.variant, %sequence, "using configured step order");
                sequence
            }
            Err(error) => {
                warn!(
                    variant = %self.variant,
                    config = %raw,
                    %error,
                    "invalid step order; using default"
                );
                self.default_sequence()
            }
        }
    }

    /// A named alternative order, if the variant defines one.
    pub fn preset(
        &self,
        name: &str,
    ) -> Option<StepSequence> {
        match self.variant {
            ProductVariant::Fence => FENCE_PRESETS
                .iter()
                .find(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
                .map(|(_, steps)| StepSequence::new(steps.to_vec())),
            ProductVariant::Shower => {
                name.trim().eq_ignore_ascii_case("default").then(|| self.default_sequence())
            }
        }
    }

    pub fn preset_names(&self) -> Vec<&'static str> {
        match self.variant {
            ProductVariant::Fence => FENCE_PRESETS.iter().map(|(name, _)| *name).collect(),
            ProductVariant::Shower => vec!["default"],
        }
    }
}

/// Resolves the step order for `variant`; see [`StepRegistry::resolve`].
pub fn resolve_step_sequence(
    raw_config: Option<&str>,
    variant: ProductVariant,
) -> StepSequence {
    StepRegistry::new(variant).resolve(raw_config)
}
