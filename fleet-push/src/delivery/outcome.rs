//! Per-subscriber delivery outcomes and the run summary.

use serde::Serialize;

/// Longest response body excerpt kept in a failure reason.
const MAX_REASON_CHARS: usize = 500;

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The push service accepted the message.
    Sent,
    /// The endpoint is gone or no longer accepts our credentials. The
    /// subscription is removed at the end of the run.
    Invalidated(String),
    /// Anything else. The subscription stays and is tried again next run.
    TransientFailure(String),
}

impl DeliveryOutcome {
    /// Classify a push service response.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            200 | 201 => Self::Sent,
            403 | 404 | 410 => Self::Invalidated(describe(status, body)),
            _ => Self::TransientFailure(describe(status, body)),
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    pub fn is_invalidated(&self) -> bool {
        matches!(self, Self::Invalidated(_))
    }
}

fn describe(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, excerpt(body, MAX_REASON_CHARS))
    }
}

/// Outcome for one subscription, as returned to the trigger caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberReport {
    pub endpoint: String,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl SubscriberReport {
    pub fn new(endpoint: impl Into<String>, outcome: DeliveryOutcome, http_status: Option<u16>) -> Self {
        Self {
            endpoint: endpoint.into(),
            outcome,
            http_status,
        }
    }
}

/// Aggregate of a fan-out run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    /// Invalidated plus transient failures.
    pub failed: usize,
    /// Invalidated only.
    pub expired: usize,
    pub details: Vec<SubscriberReport>,
    pub invalidated_endpoints: Vec<String>,
}

impl DeliveryReport {
    pub fn from_reports(details: Vec<SubscriberReport>) -> Self {
        let mut report = Self::default();
        for entry in &details {
            match &entry.outcome {
                DeliveryOutcome::Sent => report.sent += 1,
                DeliveryOutcome::Invalidated(_) => {
                    report.failed += 1;
                    report.expired += 1;
                    report.invalidated_endpoints.push(entry.endpoint.clone());
                }
                DeliveryOutcome::TransientFailure(_) => report.failed += 1,
            }
        }
        report.details = details;
        report
    }

    /// Endpoints that accepted the message.
    pub fn sent_endpoints(&self) -> impl Iterator<Item = &str> {
        self.details
            .iter()
            .filter(|d| d.outcome.is_sent())
            .map(|d| d.endpoint.as_str())
    }
}

/// Keep at most `max_chars` characters, marking the cut with an ellipsis.
fn excerpt(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &input[..cut]),
        None => input.to_string(),
    }
}
