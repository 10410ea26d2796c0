use std::fmt;

use serde::{Deserialize, Serialize};

use super::choices::{
    MaterialType, PlumbingCondition, ProjectType, PropertyType, ServiceType, ShowerIssue,
    WaterHeaterType,
};

/// Upper bound on the free-text project description.
pub const PROJECT_DETAILS_MAX_CHARS: usize = 1000;

/// Every answer any step of either estimator variant can set, plus the
/// current step index.
///
/// One record exists per wizard session. Defaults are the "nothing chosen
/// yet" values (`"Not sure"` for categorical answers, empty collections and
/// strings, `None` for the bathtub question).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnswerRecord {
    // Fence estimator
    pub property_type: PropertyType,
    pub service_type: ServiceType,
    pub materials: Vec<MaterialType>,
    pub project_details: String,

    // Contact information
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub zip_code: String,

    // Shower estimator
    pub shower_issues: Vec<ShowerIssue>,
    pub existing_water_heater: WaterHeaterType,
    pub plumbing_condition: PlumbingCondition,
    pub has_existing_bathtub: Option<bool>,
    pub project_type: ProjectType,

    pub current_step: usize,
}

impl AnswerRecord {
    /// Shallow-merges every field present in `update`. No validation.
    pub fn apply(
        &mut self,
        update: AnswerUpdate,
    ) {
        let AnswerUpdate {
            property_type,
            service_type,
            materials,
            project_details,
            full_name,
            email,
            phone,
            address,
            zip_code,
            shower_issues,
            existing_water_heater,
            plumbing_condition,
            has_existing_bathtub,
            project_type,
        } = update;

        if let Some(v) = property_type {
            self.property_type = v;
        }
        if let Some(v) = service_type {
            self.service_type = v;
        }
        if let Some(v) = materials {
            self.materials = v;
        }
        if let Some(v) = project_details {
            self.project_details = v;
        }
        if let Some(v) = full_name {
            self.full_name = v;
        }
        if let Some(v) = email {
            self.email = v;
        }
        if let Some(v) = phone {
            self.phone = v;
        }
        if let Some(v) = address {
            self.address = v;
        }
        if let Some(v) = zip_code {
            self.zip_code = v;
        }
        if let Some(v) = shower_issues {
            self.shower_issues = exclusive_none(v);
        }
        if let Some(v) = existing_water_heater {
            self.existing_water_heater = v;
        }
        if let Some(v) = plumbing_condition {
            self.plumbing_condition = v;
        }
        if let Some(v) = has_existing_bathtub {
            self.has_existing_bathtub = v;
        }
        if let Some(v) = project_type {
            self.project_type = v;
        }
    }

    /// Adds `material` if absent, removes it if present.
    pub fn toggle_material(
        &mut self,
        material: MaterialType,
    ) {
        if let Some(pos) = self.materials.iter().position(|m| *m == material) {
            self.materials.remove(pos);
        } else {
            self.materials.push(material);
        }
    }

    /// Toggles a shower issue. `None` is exclusive: choosing it clears every
    /// other issue, and choosing any other issue drops `None`.
    pub fn toggle_shower_issue(
        &mut self,
        issue: ShowerIssue,
    ) {
        if issue == ShowerIssue::None {
            if self.shower_issues.contains(&ShowerIssue::None) {
                self.shower_issues.clear();
            } else {
                self.shower_issues = vec![ShowerIssue::None];
            }
            return;
        }

        if let Some(pos) = self.shower_issues.iter().position(|i| *i == issue) {
            self.shower_issues.remove(pos);
        } else {
            self.shower_issues.retain(|i| *i != ShowerIssue::None);
            self.shower_issues.push(issue);
        }
    }
}

/// Replays `picked` as a series of selections, so `None` never shares the
/// list with a real issue and later picks win.
fn exclusive_none(picked: Vec<ShowerIssue>) -> Vec<ShowerIssue> {
    let mut issues = Vec::with_capacity(picked.len());
    for issue in picked {
        if issue == ShowerIssue::None {
            issues.clear();
            issues.push(issue);
        } else if !issues.contains(&issue) {
            issues.retain(|i| *i != ShowerIssue::None);
            issues.push(issue);
        }
    }
    issues
}

/// Partial update of an [`AnswerRecord`]; `None` leaves a field untouched.
///
/// `has_existing_bathtub` is doubly optional so an update can explicitly
/// clear the answer back to "unanswered".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerUpdate {
    pub property_type: Option<PropertyType>,
    pub service_type: Option<ServiceType>,
    pub materials: Option<Vec<MaterialType>>,
    pub project_details: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub zip_code: Option<String>,
    pub shower_issues: Option<Vec<ShowerIssue>>,
    pub existing_water_heater: Option<WaterHeaterType>,
    pub plumbing_condition: Option<PlumbingCondition>,
    pub has_existing_bathtub: Option<Option<bool>>,
    pub project_type: Option<ProjectType>,
}

impl AnswerUpdate {
    /// The fields this update will overwrite.
    pub fn fields(&self) -> Vec<Field> {
        let touched = [
            (self.property_type.is_some(), Field::PropertyType),
            (self.service_type.is_some(), Field::ServiceType),
            (self.materials.is_some(), Field::Materials),
            (self.project_details.is_some(), Field::ProjectDetails),
            (self.full_name.is_some(), Field::FullName),
            (self.email.is_some(), Field::Email),
            (self.phone.is_some(), Field::Phone),
            (self.address.is_some(), Field::Address),
            (self.zip_code.is_some(), Field::ZipCode),
            (self.shower_issues.is_some(), Field::ShowerIssues),
            (self.existing_water_heater.is_some(), Field::ExistingWaterHeater),
            (self.plumbing_condition.is_some(), Field::PlumbingCondition),
            (self.has_existing_bathtub.is_some(), Field::HasExistingBathtub),
            (self.project_type.is_some(), Field::ProjectType),
        ];

        touched
            .into_iter()
            .filter_map(|(set, field)| set.then_some(field))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

/// Names a single answer field. Validation errors are keyed by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    PropertyType,
    ServiceType,
    Materials,
    ProjectDetails,
    FullName,
    Email,
    Phone,
    Address,
    ZipCode,
    ShowerIssues,
    ExistingWaterHeater,
    PlumbingCondition,
    HasExistingBathtub,
    ProjectType,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PropertyType => "propertyType",
            Self::ServiceType => "serviceType",
            Self::Materials => "materials",
            Self::ProjectDetails => "projectDetails",
            Self::FullName => "fullName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::ZipCode => "zipCode",
            Self::ShowerIssues => "showerIssues",
            Self::ExistingWaterHeater => "existingWaterHeater",
            Self::PlumbingCondition => "plumbingCondition",
            Self::HasExistingBathtub => "hasExistingBathtub",
            Self::ProjectType => "projectType",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
