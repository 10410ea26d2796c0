//! Event tracking collaborator.
//!
//! The wizard reports step views and submission outcomes through an
//! [`AnalyticsSink`]. Sinks may fail; callers log the failure and carry on,
//! tracking never changes wizard state.

use std::sync::Mutex;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("analytics sink unavailable: {0}")]
    Unavailable(String),
}

/// A named event and its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsEvent {
    pub name: String,
    pub properties: Map<String, Value>,
}

impl AnalyticsEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Map::new(),
        }
    }

    pub fn with(
        mut self,
        key: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property(
        &self,
        key: &str,
    ) -> Option<&Value> {
        self.properties.get(key)
    }
}

pub trait AnalyticsSink: Send + Sync {
    fn track(
        &self,
        event: &AnalyticsEvent,
    ) -> Result<(), AnalyticsError>;
}

/// Writes every event to the `analytics` tracing target.
#[derive(Debug, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn track(
        &self,
        event: &AnalyticsEvent,
    ) -> Result<(), AnalyticsError> {
        let properties = Value::Object(event.properties.clone());
        info!(
            target: "analytics",
            event = %event.name,
            %properties,
            "tracked"
        );
        Ok(())
    }
}

/// Drops every event.
#[derive(Debug, Default)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn track(
        &self,
        _event: &AnalyticsEvent,
    ) -> Result<(), AnalyticsError> {
        Ok(())
    }
}

/// Keeps events in memory; handy for front ends that batch uploads and for
/// tests.
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn track(
        &self,
        event: &AnalyticsEvent,
    ) -> Result<(), AnalyticsError> {
        self.events
            .lock()
            .map_err(|_| AnalyticsError::Unavailable("event buffer poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn builder_collects_properties() {
        let event = AnalyticsEvent::new("form_step_view")
            .with("form_name", "fence_estimator")
            .with("step_number", 2);

        assert_eq!(event.property("form_name"), Some(&json!("fence_estimator")));
        assert_eq!(event.property("step_number"), Some(&json!(2)));
        assert_eq!(event.property("missing"), None);
    }

    #[test]
    fn recording_sink_keeps_events_in_order() {
        let sink = RecordingAnalytics::new();
        sink.track(&AnalyticsEvent::new("a")).unwrap();
        sink.track(&AnalyticsEvent::new("b")).unwrap();

        assert_eq!(sink.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn tracing_sink_logs_properties_without_failing() {
        let event = AnalyticsEvent::new("form_submission_failure")
            .with("form_name", "shower_estimator")
            .with("error", "missing table");

        assert_eq!(TracingAnalytics.track(&event), Ok(()));
    }
}
