use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::shared::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceOutcome {
    Issued,
    Rejected(ErrorKind),
}

/// One record per call to the issuance endpoint
#[derive(Debug, Clone)]
pub struct IssuanceEvent {
    pub outcome: IssuanceOutcome,
    pub client: String,
    pub request_id: Option<String>,
    pub at: DateTime<Utc>,
}

impl IssuanceEvent {
    pub fn new(outcome: IssuanceOutcome, client: &str, request_id: Option<String>) -> Self {
        Self {
            outcome,
            client: client.to_string(),
            request_id,
            at: Utc::now(),
        }
    }
}

/// Sink for issuance success/failure events
pub trait IssuanceTelemetry: Send + Sync {
    fn record(&self, event: IssuanceEvent);
}

/// Emits each event as a `tracing` event
#[derive(Debug, Default)]
pub struct TracingTelemetry;

impl TracingTelemetry {
    pub fn new() -> Self {
        Self
    }
}

impl IssuanceTelemetry for TracingTelemetry {
    fn record(&self, event: IssuanceEvent) {
        let request_id = event.request_id.as_deref().unwrap_or("-");
        match event.outcome {
            IssuanceOutcome::Issued => info!(
                target: "chatkit_session::telemetry",
                outcome = "issued",
                client = %event.client,
                request_id = %request_id,
                at = %event.at.to_rfc3339(),
                "session issuance"
            ),
            IssuanceOutcome::Rejected(kind) => warn!(
                target: "chatkit_session::telemetry",
                outcome = "rejected",
                kind = %kind,
                client = %event.client,
                request_id = %request_id,
                at = %event.at.to_rfc3339(),
                "session issuance"
            ),
        }
    }
}

/// Keeps every event in memory; handy for asserting on what was emitted
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<IssuanceEvent>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<IssuanceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn outcomes(&self) -> Vec<IssuanceOutcome> {
        self.events().into_iter().map(|e| e.outcome).collect()
    }
}

impl IssuanceTelemetry for RecordingTelemetry {
    fn record(&self, event: IssuanceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
