//! The estimator wizard: step ordering, answer state, per-step validation,
//! submission and the state machine tying them together.
//!
//! [`WizardController`] is synchronous and performs no I/O; it returns
//! [`Effect`]s that [`WizardSession`] executes on a tokio runtime.

pub mod controller;
pub mod pipeline;
pub mod registry;
pub mod session;
pub mod store;
pub mod timer;
pub mod validator;

pub use controller::{
    ControllerSettings, Effect, FeedbackKind, StepView, SubmitProps, TimerId, Transition,
    WizardController, WizardEvent, WizardState,
};
pub use pipeline::{SubmissionPipeline, map_answers_to_submission};
pub use registry::{SequenceError, StepRegistry, StepSequence, StepDef, resolve_step_sequence};
pub use session::WizardSession;
pub use store::FormStateStore;
pub use timer::ResetTimer;
pub use validator::{StepValidator, ValidationError};
