use crate::models::{AnswerRecord, AnswerUpdate, MaterialType, ShowerIssue};

/// Owns the session's [`AnswerRecord`] and keeps `current_step` inside
/// `0..step_count`.
///
/// Nothing here validates; the controller decides when `next` is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormStateStore {
    answers: AnswerRecord,
    step_count: usize,
}

impl FormStateStore {
    pub fn new(step_count: usize) -> Self {
        Self {
            answers: AnswerRecord::default(),
            step_count,
        }
    }

    /// Starts from previously saved answers; an out-of-range step is pulled
    /// back to the last step.
    pub fn load(
        step_count: usize,
        answers: AnswerRecord,
    ) -> Self {
        let mut store = Self {
            answers,
            step_count,
        };
        store.clamp();
        store
    }

    pub fn answers(&self) -> &AnswerRecord {
        &self.answers
    }

    pub fn current_step(&self) -> usize {
        self.answers.current_step
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn is_last_step(&self) -> bool {
        self.answers.current_step + 1 >= self.step_count
    }

    pub fn update(
        &mut self,
        update: AnswerUpdate,
    ) {
        self.answers.apply(update);
    }

    pub fn toggle_material(
        &mut self,
        material: MaterialType,
    ) {
        self.answers.toggle_material(material);
    }

    pub fn toggle_shower_issue(
        &mut self,
        issue: ShowerIssue,
    ) {
        self.answers.toggle_shower_issue(issue);
    }

    /// Restores every field to its default, including `current_step`.
    pub fn reset(&mut self) {
        self.answers = AnswerRecord::default();
    }

    /// Jumps to `index`; anything outside `0..step_count` is ignored.
    pub fn goto(
        &mut self,
        index: usize,
    ) {
        if index < self.step_count {
            self.answers.current_step = index;
        }
    }

    pub fn next(&mut self) {
        if !self.is_last_step() {
            self.answers.current_step += 1;
        }
    }

    pub fn prev(&mut self) {
        self.answers.current_step = self.answers.current_step.saturating_sub(1);
    }

    fn clamp(&mut self) {
        let last = self.step_count.saturating_sub(1);
        if self.answers.current_step > last {
            self.answers.current_step = last;
        }
    }
}
