//! Line-oriented front end for a [`WizardSession`].
//!
//! Each step is rendered from the controller's [`StepView`] and answered one
//! field per line. Typing `:back` returns to the previous step and `:quit`
//! (or end of input) leaves the wizard.

use std::fmt;
use std::io::Write;

use anyhow::Result;
use estimator_core::wizard::{FeedbackKind, StepView, WizardEvent, WizardSession, WizardState};
use estimator_core::{
    AnswerRecord, AnswerUpdate, MaterialType, PlumbingCondition, ProductVariant, ProjectType,
    PropertyType, ServiceType, ShowerIssue, StepId, WaterHeaterType,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, warn};

const BACK_COMMAND: &str = ":back";
const QUIT_COMMAND: &str = ":quit";
/// Clears a multi-select answer.
const CLEAR_SELECTION: &str = "-";

/// One answer, or a request to leave the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply<T> {
    Value(T),
    Back,
    Quit,
}

/// Unwraps a [`Reply::Value`] or returns the navigation request to the
/// caller.
macro_rules! ask {
    ($reply:expr) => {
        match $reply {
            Reply::Value(value) => value,
            Reply::Back => return Ok(Reply::Back),
            Reply::Quit => return Ok(Reply::Quit),
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedbackChoice {
    Dismiss,
    Restart,
    /// A reset timer fired. `reset` is false when the controller ignored it.
    TimedOut { reset: bool },
    Quit,
}

/// Counts of what happened during [`Terminal::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: usize,
    pub succeeded: usize,
}

pub struct Terminal<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(
        input: R,
        out: W,
    ) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    /// Drives `session` until the user quits or input runs out, then tears
    /// the session down.
    pub async fn run(
        &mut self,
        session: &mut WizardSession,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let variant = session.controller().variant();
        writeln!(
            self.out,
            "Type {BACK_COMMAND} to go back a step or {QUIT_COMMAND} to leave."
        )?;

        loop {
            match session.state().clone() {
                WizardState::Step(_) => {
                    let Some(view) = session.current_view() else {
                        warn!("no step to show; leaving wizard");
                        break;
                    };
                    self.render_step(&view)?;

                    let answers = session.answers().clone();
                    match self.collect(view.step, variant, &answers).await? {
                        Reply::Value(events) => {
                            for event in events {
                                session.handle(event).await;
                            }
                            if let WizardState::Feedback { kind, .. } =
                                session.handle(WizardEvent::Advance).await
                            {
                                summary.submitted += 1;
                                if *kind == FeedbackKind::Success {
                                    summary.succeeded += 1;
                                }
                            }
                        }
                        Reply::Back => {
                            session.handle(WizardEvent::Back).await;
                        }
                        Reply::Quit => break,
                    }
                }
                WizardState::Submitting => {
                    // Submissions resolve inside `handle`; nothing to wait for here.
                    warn!("session left in submitting state");
                    break;
                }
                WizardState::Feedback { kind, message } => {
                    self.render_feedback(kind, &message)?;
                    let choice = loop {
                        match self.feedback_choice(session).await? {
                            FeedbackChoice::TimedOut { reset: false } => continue,
                            choice => break choice,
                        }
                    };
                    match choice {
                        FeedbackChoice::Dismiss => {
                            session.handle(WizardEvent::Dismiss).await;
                        }
                        FeedbackChoice::Restart => {
                            session.handle(WizardEvent::Restart).await;
                        }
                        FeedbackChoice::TimedOut { .. } => {
                            writeln!(self.out, "\nStarting a new estimate.")?;
                        }
                        FeedbackChoice::Quit => break,
                    }
                }
            }
        }

        session.teardown().await;
        Ok(summary)
    }

    fn render_step(
        &mut self,
        view: &StepView,
    ) -> Result<()> {
        writeln!(
            self.out,
            "\nStep {} of {}: {}",
            view.index + 1,
            view.total,
            view.title
        )?;
        for error in &view.errors {
            writeln!(self.out, "  ! {}", error.message)?;
        }
        if view.submit.is_some() {
            writeln!(self.out, "  (your estimate request is sent after this step)")?;
        }
        Ok(())
    }

    fn render_feedback(
        &mut self,
        kind: FeedbackKind,
        message: &str,
    ) -> Result<()> {
        match kind {
            FeedbackKind::Success => {
                writeln!(self.out, "\n{message}")?;
                write!(
                    self.out,
                    "Press Enter to start a new estimate, or {QUIT_COMMAND} to leave: "
                )?;
            }
            FeedbackKind::Error => {
                writeln!(self.out, "\nSubmission failed: {message}")?;
                write!(
                    self.out,
                    "Press Enter to review your answers, 'r' to start over, or {QUIT_COMMAND} to leave: "
                )?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Waits for the user or for the auto-reset timer, whichever comes first.
    async fn feedback_choice(
        &mut self,
        session: &mut WizardSession,
    ) -> Result<FeedbackChoice> {
        let choice = tokio::select! {
            biased;
            line = self.lines.next_line() => match line? {
                None => FeedbackChoice::Quit,
                Some(line) => match line.trim() {
                    QUIT_COMMAND => FeedbackChoice::Quit,
                    "r" | "R" => FeedbackChoice::Restart,
                    _ => FeedbackChoice::Dismiss,
                },
            },
            state = session.next_timer_event() => FeedbackChoice::TimedOut {
                reset: !matches!(state, WizardState::Feedback { .. }),
            },
        };
        debug!(?choice, "feedback answered");
        Ok(choice)
    }

    /// Asks for every field `step` shows and turns the answers into events.
    async fn collect(
        &mut self,
        step: StepId,
        variant: ProductVariant,
        answers: &AnswerRecord,
    ) -> Result<Reply<Vec<WizardEvent>>> {
        let mut update = AnswerUpdate::default();
        let mut events = Vec::new();

        match step {
            StepId::PropertyType => {
                update.property_type = Some(ask!(
                    self.choose_one("Property type", PropertyType::ALL, answers.property_type)
                        .await?
                ));
            }
            StepId::ServiceType => {
                update.service_type = Some(ask!(
                    self.choose_one("Service", ServiceType::ALL, answers.service_type)
                        .await?
                ));
            }
            StepId::Materials => {
                update.materials = Some(ask!(
                    self.choose_many("Materials", MaterialType::ALL, &answers.materials)
                        .await?
                ));
            }
            StepId::ProjectDetails => {
                update.project_details = Some(ask!(
                    self.text("Project details (optional)", &answers.project_details)
                        .await?
                ));
            }
            StepId::ContactInfo | StepId::UserInfo => {
                update.full_name = Some(ask!(self.text("Full name", &answers.full_name).await?));
                update.email = Some(ask!(self.text("Email", &answers.email).await?));
                if step == StepId::ContactInfo {
                    update.phone = Some(ask!(self.text("Phone", &answers.phone).await?));
                    update.address = Some(ask!(self.text("Address", &answers.address).await?));
                    // The shower estimator asks for the ZIP code on its own step.
                    if variant == ProductVariant::Fence {
                        update.zip_code =
                            Some(ask!(self.text("ZIP code", &answers.zip_code).await?));
                    }
                }
            }
            StepId::ProjectType => {
                update.project_type = Some(ask!(
                    self.choose_one("Project", ProjectType::ALL, answers.project_type)
                        .await?
                ));
            }
            StepId::ShowerIssues => {
                let chosen = ask!(
                    self.choose_many("Issues", ShowerIssue::ALL, &answers.shower_issues)
                        .await?
                );
                // Rebuild through toggles so "None" stays exclusive.
                update.shower_issues = Some(Vec::new());
                events.extend(chosen.into_iter().map(WizardEvent::ToggleShowerIssue));
            }
            StepId::WaterHeater => {
                update.existing_water_heater = Some(ask!(
                    self.choose_one(
                        "Water heater",
                        WaterHeaterType::ALL,
                        answers.existing_water_heater
                    )
                    .await?
                ));
            }
            StepId::PlumbingCondition => {
                update.plumbing_condition = Some(ask!(
                    self.choose_one(
                        "Plumbing condition",
                        PlumbingCondition::ALL,
                        answers.plumbing_condition
                    )
                    .await?
                ));
            }
            StepId::ExistingBathtub => {
                update.has_existing_bathtub = Some(ask!(
                    self.yes_no("Is there an existing bathtub?", answers.has_existing_bathtub)
                        .await?
                ));
            }
            StepId::ZipCode => {
                update.zip_code = Some(ask!(self.text("ZIP code", &answers.zip_code).await?));
            }
        }

        events.insert(0, WizardEvent::Edit(update));
        Ok(Reply::Value(events))
    }

    async fn read(
        &mut self,
        prompt: &str,
    ) -> Result<Reply<String>> {
        write!(self.out, "{prompt}: ")?;
        self.out.flush()?;

        let Some(line) = self.lines.next_line().await? else {
            writeln!(self.out)?;
            return Ok(Reply::Quit);
        };
        Ok(match line.trim() {
            BACK_COMMAND => Reply::Back,
            QUIT_COMMAND => Reply::Quit,
            answer => Reply::Value(answer.to_string()),
        })
    }

    /// Free text; an empty line keeps `current`.
    async fn text(
        &mut self,
        label: &str,
        current: &str,
    ) -> Result<Reply<String>> {
        let prompt = if current.is_empty() {
            label.to_string()
        } else {
            format!("{label} [{current}]")
        };
        Ok(match self.read(&prompt).await? {
            Reply::Value(answer) if answer.is_empty() => Reply::Value(current.to_string()),
            other => other,
        })
    }

    async fn choose_one<T>(
        &mut self,
        label: &str,
        options: &[T],
        current: T,
    ) -> Result<Reply<T>>
    where
        T: Copy + fmt::Display,
    {
        self.list_options(options)?;
        let prompt = format!("{label} [{current}]");

        loop {
            match self.read(&prompt).await? {
                Reply::Value(answer) if answer.is_empty() => return Ok(Reply::Value(current)),
                Reply::Value(answer) => match pick(&answer, options) {
                    Some(choice) => return Ok(Reply::Value(choice)),
                    None => writeln!(
                        self.out,
                        "  Enter a number from 1 to {} or one of the options above.",
                        options.len()
                    )?,
                },
                Reply::Back => return Ok(Reply::Back),
                Reply::Quit => return Ok(Reply::Quit),
            }
        }
    }

    async fn choose_many<T>(
        &mut self,
        label: &str,
        options: &[T],
        current: &[T],
    ) -> Result<Reply<Vec<T>>>
    where
        T: Copy + PartialEq + fmt::Display,
    {
        self.list_options(options)?;
        let prompt = format!(
            "{label}, comma-separated, '{CLEAR_SELECTION}' for none [{}]",
            join(current)
        );

        loop {
            match self.read(&prompt).await? {
                Reply::Value(answer) if answer.is_empty() => {
                    return Ok(Reply::Value(current.to_vec()));
                }
                Reply::Value(answer) if answer == CLEAR_SELECTION => {
                    return Ok(Reply::Value(Vec::new()));
                }
                Reply::Value(answer) => match pick_many(&answer, options) {
                    Ok(chosen) => return Ok(Reply::Value(chosen)),
                    Err(token) => writeln!(self.out, "  '{token}' is not one of the options.")?,
                },
                Reply::Back => return Ok(Reply::Back),
                Reply::Quit => return Ok(Reply::Quit),
            }
        }
    }

    async fn yes_no(
        &mut self,
        label: &str,
        current: Option<bool>,
    ) -> Result<Reply<Option<bool>>> {
        let shown = match current {
            Some(true) => "yes",
            Some(false) => "no",
            None => "unanswered",
        };
        let prompt = format!("{label} (y/n) [{shown}]");

        loop {
            match self.read(&prompt).await? {
                Reply::Value(answer) if answer.is_empty() => return Ok(Reply::Value(current)),
                Reply::Value(answer) => match parse_yes_no(&answer) {
                    Some(value) => return Ok(Reply::Value(Some(value))),
                    None => writeln!(self.out, "  Please answer yes or no.")?,
                },
                Reply::Back => return Ok(Reply::Back),
                Reply::Quit => return Ok(Reply::Quit),
            }
        }
    }

    fn list_options<T: fmt::Display>(
        &mut self,
        options: &[T],
    ) -> Result<()> {
        for (index, option) in options.iter().enumerate() {
            writeln!(self.out, "  {}. {option}", index + 1)?;
        }
        Ok(())
    }
}

/// Matches a 1-based option number or an option label (case-insensitive).
fn pick<T>(
    input: &str,
    options: &[T],
) -> Option<T>
where
    T: Copy + fmt::Display,
{
    let input = input.trim();
    if let Ok(number) = input.parse::<usize>() {
        return number.checked_sub(1).and_then(|i| options.get(i)).copied();
    }
    options
        .iter()
        .find(|option| option.to_string().eq_ignore_ascii_case(input))
        .copied()
}

/// Comma-separated [`pick`]; duplicates collapse, first mention wins. Returns
/// the offending token on failure.
fn pick_many<T>(
    input: &str,
    options: &[T],
) -> Result<Vec<T>, String>
where
    T: Copy + PartialEq + fmt::Display,
{
    let mut chosen = Vec::new();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let choice = pick(token, options).ok_or_else(|| token.to_string())?;
        if !chosen.contains(&choice) {
            chosen.push(choice);
        }
    }
    Ok(chosen)
}

fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
