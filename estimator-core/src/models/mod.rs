mod answers;
mod choices;
mod step;
mod submission;

pub use answers::{AnswerRecord, AnswerUpdate, Field, PROJECT_DETAILS_MAX_CHARS};
pub use choices::{
    MaterialType, PlumbingCondition, ProjectType, PropertyType, ServiceType, ShowerIssue,
    WaterHeaterType,
};
pub use step::{ProductVariant, StepId};
pub use submission::{NewSubmission, Submission, SubmissionResult};
