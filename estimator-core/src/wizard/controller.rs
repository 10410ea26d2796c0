//! The wizard state machine.
//!
//! ```text
//! Step(i) --Advance, valid, i < last--> Step(i + 1)
//! Step(i) --Advance, invalid----------> Step(i)          errors attached
//! Step(last) --Advance, valid---------> Submitting       Submit effect
//! Submitting --SubmissionResolved-----> Feedback(kind)
//! Feedback(success) --Dismiss | Restart | AutoResetElapsed--> Step(0)   answers reset
//! Feedback(error) --Dismiss-----------> Step(last)       answers kept
//! Feedback(error) --Restart-----------> Step(0)          answers reset
//! Step(i) --Back, i > 0---------------> Step(i - 1)
//! ```
//!
//! The controller never sleeps, writes or sends anything. It returns
//! [`Effect`]s and expects the owner to carry them out.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::analytics::AnalyticsEvent;
use crate::config::{DEFAULT_RESET_TIMEOUT, EstimatorConfig};
use crate::models::{
    AnswerRecord, AnswerUpdate, Field, MaterialType, ProductVariant, ShowerIssue, StepId,
    SubmissionResult,
};

use super::registry::{StepRegistry, StepSequence};
use super::store::FormStateStore;
use super::validator::{StepValidator, ValidationError};

pub const STEP_VIEW_EVENT: &str = "form_step_view";
pub const SUBMISSION_SUCCESS_EVENT: &str = "form_submission_success";
pub const SUBMISSION_FAILURE_EVENT: &str = "form_submission_failure";

/// Generation number of an armed reset timer. Only the most recently armed
/// id is honoured when it elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

impl TimerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    Step(usize),
    Submitting,
    Feedback { kind: FeedbackKind, message: String },
}

impl WizardState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    Edit(AnswerUpdate),
    ToggleMaterial(MaterialType),
    ToggleShowerIssue(ShowerIssue),
    /// Next button, or submit on the last step.
    Advance,
    Back,
    GoTo(usize),
    SubmissionResolved(SubmissionResult),
    Dismiss,
    /// "Start a new estimate" from the feedback screen.
    Restart,
    AutoResetElapsed(TimerId),
    Teardown,
}

/// Work the owner of a controller must perform after a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Run the submission pipeline and dispatch `SubmissionResolved`.
    Submit(AnswerRecord),
    /// Dispatch `AutoResetElapsed(id)` once `after` has passed.
    ArmResetTimer { id: TimerId, after: Duration },
    CancelResetTimer(TimerId),
    Track(AnalyticsEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: WizardState,
    pub to: WizardState,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub auto_reset_enabled: bool,
    pub reset_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            auto_reset_enabled: true,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
        }
    }
}

impl From<&EstimatorConfig> for ControllerSettings {
    fn from(config: &EstimatorConfig) -> Self {
        Self {
            auto_reset_enabled: config.auto_reset_enabled,
            reset_timeout: config.reset_timeout,
        }
    }
}

/// Props handed to the terminal step's renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmitProps {
    pub is_submitting: bool,
}

/// What a front end needs to draw the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step: StepId,
    pub index: usize,
    pub total: usize,
    pub title: &'static str,
    pub errors: Vec<ValidationError>,
    /// Present only on the last step.
    pub submit: Option<SubmitProps>,
}

pub struct WizardController {
    registry: StepRegistry,
    validator: StepValidator,
    sequence: StepSequence,
    store: FormStateStore,
    settings: ControllerSettings,
    state: WizardState,
    errors: Vec<ValidationError>,
    pending_timer: Option<TimerId>,
    timer_generation: u64,
}

impl WizardController {
    pub fn new(
        variant: ProductVariant,
        sequence: StepSequence,
        settings: ControllerSettings,
    ) -> Self {
        Self::resume(variant, sequence, settings, AnswerRecord::default())
    }

    /// Continues from saved answers; their `current_step` is clamped to the
    /// sequence.
    pub fn resume(
        variant: ProductVariant,
        sequence: StepSequence,
        settings: ControllerSettings,
        answers: AnswerRecord,
    ) -> Self {
        let store = FormStateStore::load(sequence.len(), answers);
        let state = WizardState::Step(store.current_step());

        Self {
            registry: StepRegistry::new(variant),
            validator: StepValidator::new(variant),
            sequence,
            store,
            settings,
            state,
            errors: Vec::new(),
            pending_timer: None,
            timer_generation: 0,
        }
    }

    pub fn variant(&self) -> ProductVariant {
        self.registry.variant()
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn answers(&self) -> &AnswerRecord {
        self.store.answers()
    }

    pub fn sequence(&self) -> &StepSequence {
        &self.sequence
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn error_for(
        &self,
        field: Field,
    ) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending_timer
    }

    pub fn current_step(&self) -> Option<StepId> {
        self.sequence.get(self.store.current_step())
    }

    pub fn current_view(&self) -> Option<StepView> {
        let index = self.store.current_step();
        let step = self.sequence.get(index)?;
        let submit = self.store.is_last_step().then(|| SubmitProps {
            is_submitting: self.state.is_submitting(),
        });

        Some(StepView {
            step,
            index,
            total: self.sequence.len(),
            title: self.registry.title(step),
            errors: self.errors.clone(),
            submit,
        })
    }

    /// Effects owed for the state the controller starts in.
    pub fn initial_effects(&self) -> Vec<Effect> {
        self.step_view_event().map(Effect::Track).into_iter().collect()
    }

    pub fn dispatch(
        &mut self,
        event: WizardEvent,
    ) -> Transition {
        let from = self.state.clone();
        let mut effects = Vec::new();

        match (self.state.clone(), event) {
            (WizardState::Step(_), WizardEvent::Edit(update)) => {
                let touched = update.fields();
                self.store.update(update);
                self.errors.retain(|e| !touched.contains(&e.field));
            }
            (WizardState::Step(_), WizardEvent::ToggleMaterial(material)) => {
                self.store.toggle_material(material);
                self.errors.retain(|e| e.field != Field::Materials);
            }
            (WizardState::Step(_), WizardEvent::ToggleShowerIssue(issue)) => {
                self.store.toggle_shower_issue(issue);
                self.errors.retain(|e| e.field != Field::ShowerIssues);
            }
            (WizardState::Step(_), WizardEvent::Advance) => self.advance(&mut effects),
            (WizardState::Step(index), WizardEvent::Back) if index > 0 => {
                self.store.prev();
                self.enter_step(&mut effects);
            }
            (WizardState::Step(index), WizardEvent::GoTo(target)) => {
                self.store.goto(target);
                if self.store.current_step() != index {
                    self.enter_step(&mut effects);
                }
            }
            (WizardState::Submitting, WizardEvent::SubmissionResolved(result)) => {
                self.resolve(result, &mut effects)
            }
            (WizardState::Feedback { kind, .. }, WizardEvent::Dismiss) => {
                self.cancel_pending(&mut effects);
                match kind {
                    FeedbackKind::Success => self.reset(&mut effects),
                    FeedbackKind::Error => self.enter_step(&mut effects),
                }
            }
            (WizardState::Feedback { .. }, WizardEvent::Restart) => {
                self.cancel_pending(&mut effects);
                self.reset(&mut effects);
            }
            (
                WizardState::Feedback {
                    kind: FeedbackKind::Success,
                    ..
                },
                WizardEvent::AutoResetElapsed(id),
            ) if self.pending_timer == Some(id) => {
                self.pending_timer = None;
                self.reset(&mut effects);
            }
            (_, WizardEvent::Teardown) => self.cancel_pending(&mut effects),
            (state, event) => {
                debug!(?state, ?event, "event ignored");
            }
        }

        Transition {
            from,
            to: self.state.clone(),
            effects,
        }
    }

    fn advance(
        &mut self,
        effects: &mut Vec<Effect>,
    ) {
        let Some(step) = self.current_step() else {
            return;
        };

        let errors = self.validator.validate(step, self.store.answers());
        if !errors.is_empty() {
            debug!(%step, count = errors.len(), "step failed validation");
            self.errors = errors;
            return;
        }
        self.errors.clear();

        if self.store.is_last_step() {
            self.cancel_pending(effects);
            self.state = WizardState::Submitting;
            effects.push(Effect::Submit(self.store.answers().clone()));
        } else {
            self.store.next();
            self.enter_step(effects);
        }
    }

    fn resolve(
        &mut self,
        result: SubmissionResult,
        effects: &mut Vec<Effect>,
    ) {
        effects.push(Effect::Track(self.submission_event(&result)));

        let kind = if result.success {
            FeedbackKind::Success
        } else {
            FeedbackKind::Error
        };
        self.state = WizardState::Feedback {
            kind,
            message: result.message,
        };

        if kind == FeedbackKind::Success && self.settings.auto_reset_enabled {
            self.cancel_pending(effects);
            self.timer_generation += 1;
            let id = TimerId(self.timer_generation);
            self.pending_timer = Some(id);
            effects.push(Effect::ArmResetTimer {
                id,
                after: self.settings.reset_timeout,
            });
        }
    }

    fn reset(
        &mut self,
        effects: &mut Vec<Effect>,
    ) {
        self.store.reset();
        self.errors.clear();
        self.enter_step(effects);
    }

    fn enter_step(
        &mut self,
        effects: &mut Vec<Effect>,
    ) {
        self.state = WizardState::Step(self.store.current_step());
        self.errors.clear();
        effects.extend(self.step_view_event().map(Effect::Track));
    }

    fn cancel_pending(
        &mut self,
        effects: &mut Vec<Effect>,
    ) {
        if let Some(id) = self.pending_timer.take() {
            effects.push(Effect::CancelResetTimer(id));
        }
    }

    fn step_view_event(&self) -> Option<AnalyticsEvent> {
        let index = self.store.current_step();
        let step = self.sequence.get(index)?;

        Some(
            AnalyticsEvent::new(STEP_VIEW_EVENT)
                .with("form_name", self.variant().form_name())
                .with("step_id", step.as_str())
                .with("step_number", index + 1)
                .with("total_steps", self.sequence.len()),
        )
    }

    fn submission_event(
        &self,
        result: &SubmissionResult,
    ) -> AnalyticsEvent {
        let answers = self.store.answers();
        let form_name = self.variant().form_name();
        let name = if result.success {
            SUBMISSION_SUCCESS_EVENT
        } else {
            SUBMISSION_FAILURE_EVENT
        };

        let mut event = AnalyticsEvent::new(name)
            .with("form_name", form_name)
            .with("form_type", form_name);

        event = match self.variant() {
            ProductVariant::Fence => event
                .with("property_type", answers.property_type.as_str())
                .with("service_type", answers.service_type.as_str())
                .with("materials_count", answers.materials.len()),
            ProductVariant::Shower => event
                .with("project_type", answers.project_type.as_str())
                .with("shower_issues_count", answers.shower_issues.len()),
        };

        if !result.success {
            event = event.with("error_message", Value::String(result.message.clone()));
        }
        event
    }
}
