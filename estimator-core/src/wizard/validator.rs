use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::{
    AnswerRecord, Field, PROJECT_DETAILS_MAX_CHARS, ProductVariant, PropertyType, ServiceType,
    ShowerIssue, StepId,
};

use super::registry::StepRegistry;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email pattern: {e}"))
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9()\-.\s]{10,}$").unwrap_or_else(|e| panic!("phone pattern: {e}"))
});

static ZIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}$").unwrap_or_else(|e| panic!("zip pattern: {e}")));

/// One failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

/// A check on one answer field. `check` returns the message to show when the
/// value is unacceptable.
pub struct FieldRule {
    pub field: Field,
    pub check: fn(&AnswerRecord) -> Option<&'static str>,
}

impl std::fmt::Debug for FieldRule {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("FieldRule").field("field", &self.field).finish()
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn property_type(a: &AnswerRecord) -> Option<&'static str> {
    (a.property_type == PropertyType::NotSure).then_some("Please select a property type")
}

fn service_type(a: &AnswerRecord) -> Option<&'static str> {
    (a.service_type == ServiceType::NotSure).then_some("Please select a service type")
}

fn materials(a: &AnswerRecord) -> Option<&'static str> {
    a.materials.is_empty().then_some("Select at least one material type")
}

fn project_details(a: &AnswerRecord) -> Option<&'static str> {
    (a.project_details.chars().count() > PROJECT_DETAILS_MAX_CHARS)
        .then_some("Project details must be 1000 characters or less")
}

fn full_name(a: &AnswerRecord) -> Option<&'static str> {
    is_blank(&a.full_name).then_some("Name is required")
}

fn email(a: &AnswerRecord) -> Option<&'static str> {
    if is_blank(&a.email) {
        Some("Email is required")
    } else if !EMAIL.is_match(a.email.trim()) {
        Some("Please enter a valid email address")
    } else {
        None
    }
}

fn phone(a: &AnswerRecord) -> Option<&'static str> {
    if is_blank(&a.phone) {
        Some("Phone number is required")
    } else if !PHONE.is_match(a.phone.trim()) {
        Some("Please enter a valid phone number")
    } else {
        None
    }
}

fn address(a: &AnswerRecord) -> Option<&'static str> {
    is_blank(&a.address).then_some("Address is required")
}

fn contact_zip(a: &AnswerRecord) -> Option<&'static str> {
    (!ZIP.is_match(a.zip_code.trim())).then_some("ZIP code should be 5 digits")
}

fn shower_issues(a: &AnswerRecord) -> Option<&'static str> {
    if a.shower_issues.is_empty() {
        Some("Please select at least one option")
    } else if a.shower_issues.len() > 1 && a.shower_issues.contains(&ShowerIssue::None) {
        Some("\"None\" cannot be combined with other issues")
    } else {
        None
    }
}

fn existing_bathtub(a: &AnswerRecord) -> Option<&'static str> {
    a.has_existing_bathtub.is_none().then_some("Please select Yes or No")
}

fn zip_code(a: &AnswerRecord) -> Option<&'static str> {
    (!ZIP.is_match(a.zip_code.trim())).then_some("Please enter a valid 5-digit ZIP code")
}

pub(crate) const PROPERTY_TYPE_RULES: &[FieldRule] = &[FieldRule {
    field: Field::PropertyType,
    check: property_type,
}];

pub(crate) const SERVICE_TYPE_RULES: &[FieldRule] = &[FieldRule {
    field: Field::ServiceType,
    check: service_type,
}];

pub(crate) const MATERIALS_RULES: &[FieldRule] = &[FieldRule {
    field: Field::Materials,
    check: materials,
}];

pub(crate) const PROJECT_DETAILS_RULES: &[FieldRule] = &[FieldRule {
    field: Field::ProjectDetails,
    check: project_details,
}];

pub(crate) const CONTACT_INFO_RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::FullName,
        check: full_name,
    },
    FieldRule {
        field: Field::Email,
        check: email,
    },
    FieldRule {
        field: Field::Phone,
        check: phone,
    },
    FieldRule {
        field: Field::Address,
        check: address,
    },
    FieldRule {
        field: Field::ZipCode,
        check: contact_zip,
    },
];

pub(crate) const USER_INFO_RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::FullName,
        check: full_name,
    },
    FieldRule {
        field: Field::Email,
        check: email,
    },
];

pub(crate) const SHOWER_ISSUES_RULES: &[FieldRule] = &[FieldRule {
    field: Field::ShowerIssues,
    check: shower_issues,
}];

pub(crate) const EXISTING_BATHTUB_RULES: &[FieldRule] = &[FieldRule {
    field: Field::HasExistingBathtub,
    check: existing_bathtub,
}];

pub(crate) const ZIP_CODE_RULES: &[FieldRule] = &[FieldRule {
    field: Field::ZipCode,
    check: zip_code,
}];

/// Runs a step's field rules against the current answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepValidator {
    registry: StepRegistry,
}

impl StepValidator {
    pub fn new(variant: ProductVariant) -> Self {
        Self {
            registry: StepRegistry::new(variant),
        }
    }

    /// Every failing field of `step`, in rule order. Steps without a definition
    /// always pass.
    pub fn validate(
        &self,
        step: StepId,
        answers: &AnswerRecord,
    ) -> Vec<ValidationError> {
        let Some(def) = self.registry.definition(step) else {
            return Vec::new();
        };

        def.rules
            .iter()
            .filter_map(|rule| {
                (rule.check)(answers).map(|message| ValidationError {
                    field: rule.field,
                    message: message.to_string(),
                })
            })
            .collect()
    }
}
