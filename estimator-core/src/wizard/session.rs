use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::config::EstimatorConfig;
use crate::models::AnswerRecord;

use super::controller::{
    ControllerSettings, Effect, StepView, TimerId, WizardController, WizardEvent, WizardState,
};
use super::pipeline::SubmissionPipeline;
use super::registry::resolve_step_sequence;
use super::timer::ResetTimer;

/// One user's run through the wizard.
///
/// Owns the controller and carries out its effects: submissions go through
/// the pipeline, timers run on the tokio runtime, and events go to the
/// analytics sink. The step sequence is resolved once, here.
pub struct WizardSession {
    controller: WizardController,
    pipeline: SubmissionPipeline,
    analytics: Arc<dyn AnalyticsSink>,
    timer: ResetTimer,
    timer_events: UnboundedReceiver<TimerId>,
}

impl WizardSession {
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: &EstimatorConfig,
        pipeline: SubmissionPipeline,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        let sequence = resolve_step_sequence(config.step_order.as_deref(), config.variant);
        info!(variant = %config.variant, %sequence, "wizard session started");

        let controller =
            WizardController::new(config.variant, sequence, ControllerSettings::from(config));
        let (sender, timer_events) = mpsc::unbounded_channel();

        let session = Self {
            controller,
            pipeline,
            analytics,
            timer: ResetTimer::new(sender),
            timer_events,
        };
        for effect in session.controller.initial_effects() {
            if let Effect::Track(event) = effect {
                session.track(&event);
            }
        }
        session
    }

    pub fn controller(&self) -> &WizardController {
        &self.controller
    }

    pub fn state(&self) -> &WizardState {
        self.controller.state()
    }

    pub fn answers(&self) -> &AnswerRecord {
        self.controller.answers()
    }

    pub fn current_view(&self) -> Option<StepView> {
        self.controller.current_view()
    }

    /// Dispatches `event` and every event its effects produce, returning the
    /// state once the session is quiet again.
    pub async fn handle(
        &mut self,
        event: WizardEvent,
    ) -> &WizardState {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let transition = self.controller.dispatch(event);

            for effect in transition.effects {
                match effect {
                    Effect::Submit(answers) => {
                        let result = self.pipeline.submit(&answers).await;
                        queue.push_back(WizardEvent::SubmissionResolved(result));
                    }
                    Effect::ArmResetTimer { id, after } => self.timer.arm(id, after),
                    Effect::CancelResetTimer(id) => self.timer.cancel(id),
                    Effect::Track(event) => self.track(&event),
                }
            }
        }

        self.controller.state()
    }

    /// Waits for a reset timer to fire and applies it, returning the state
    /// afterwards. A timer the controller no longer expects leaves the state
    /// unchanged.
    ///
    /// Pends for as long as nothing fires, including while no timer is armed,
    /// so callers race it against their own input. Cancel safe while waiting.
    pub async fn next_timer_event(&mut self) -> &WizardState {
        match self.timer_events.recv().await {
            Some(id) => self.handle(WizardEvent::AutoResetElapsed(id)).await,
            // The session owns a sender, so the channel never closes.
            None => std::future::pending().await,
        }
    }

    /// Applies every timer that has already fired without waiting.
    pub async fn drain_timer_events(&mut self) -> &WizardState {
        while let Ok(id) = self.timer_events.try_recv() {
            self.handle(WizardEvent::AutoResetElapsed(id)).await;
        }
        self.controller.state()
    }

    pub async fn teardown(&mut self) {
        self.handle(WizardEvent::Teardown).await;
    }

    fn track(
        &self,
        event: &AnalyticsEvent,
    ) {
        if let Err(e) = self.analytics.track(event) {
            warn!(event = %event.name, error = %e, "analytics event dropped");
        }
    }
}
