use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one page of the wizard.
///
/// The set is the union of both product variants; which identifiers a
/// session may use is decided by its [`ProductVariant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepId {
    PropertyType,
    ServiceType,
    Materials,
    ProjectDetails,
    ContactInfo,
    UserInfo,
    ProjectType,
    ShowerIssues,
    WaterHeater,
    PlumbingCondition,
    ExistingBathtub,
    ZipCode,
}

impl StepId {
    pub const ALL: &'static [StepId] = &[
        StepId::PropertyType,
        StepId::ServiceType,
        StepId::Materials,
        StepId::ProjectDetails,
        StepId::ContactInfo,
        StepId::UserInfo,
        StepId::ProjectType,
        StepId::ShowerIssues,
        StepId::WaterHeater,
        StepId::PlumbingCondition,
        StepId::ExistingBathtub,
        StepId::ZipCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PropertyType => "propertyType",
            Self::ServiceType => "serviceType",
            Self::Materials => "materials",
            Self::ProjectDetails => "projectDetails",
            Self::ContactInfo => "contactInfo",
            Self::UserInfo => "userInfo",
            Self::ProjectType => "projectType",
            Self::ShowerIssues => "showerIssues",
            Self::WaterHeater => "waterHeater",
            Self::PlumbingCondition => "plumbingCondition",
            Self::ExistingBathtub => "existingBathtub",
            Self::ZipCode => "zipCode",
        }
    }

    /// Exact (case-sensitive) lookup; step identifiers are configuration keys.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.as_str() == s)
    }
}

impl fmt::Display for StepId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two estimator products sharing this wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductVariant {
    #[default]
    Fence,
    Shower,
}

impl ProductVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fence => "fence",
            Self::Shower => "shower",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fence" => Some(Self::Fence),
            "shower" => Some(Self::Shower),
            _ => None,
        }
    }

    /// Form name reported with every analytics event.
    pub fn form_name(&self) -> &'static str {
        match self {
            Self::Fence => "fence_estimator",
            Self::Shower => "shower_estimator",
        }
    }

    /// Step identifiers a session of this variant may contain.
    pub fn registered_steps(&self) -> &'static [StepId] {
        match self {
            Self::Fence => &[
                StepId::PropertyType,
                StepId::ServiceType,
                StepId::Materials,
                StepId::ProjectDetails,
                StepId::ContactInfo,
                StepId::UserInfo,
            ],
            Self::Shower => &[
                StepId::ProjectType,
                StepId::ShowerIssues,
                StepId::WaterHeater,
                StepId::PlumbingCondition,
                StepId::ExistingBathtub,
                StepId::ZipCode,
                StepId::ContactInfo,
            ],
        }
    }

    /// Order used when no valid custom order is configured.
    pub fn default_order(&self) -> &'static [StepId] {
        match self {
            Self::Fence => &[
                StepId::PropertyType,
                StepId::ServiceType,
                StepId::Materials,
                StepId::ProjectDetails,
                StepId::ContactInfo,
            ],
            Self::Shower => &[
                StepId::ProjectType,
                StepId::ShowerIssues,
                StepId::WaterHeater,
                StepId::PlumbingCondition,
                StepId::ExistingBathtub,
                StepId::ZipCode,
                StepId::ContactInfo,
            ],
        }
    }

    /// Strict variants only accept a custom order that is an exact
    /// permutation of [`Self::registered_steps`]. The others must still hold
    /// every step of [`Self::default_order`], though `userInfo` may take the
    /// place of `contactInfo`.
    pub fn requires_full_permutation(&self) -> bool {
        matches!(self, Self::Shower)
    }
}

impl fmt::Display for ProductVariant {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
