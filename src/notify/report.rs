use serde::Serialize;

use super::models::{Address, DeliveryOutcome, FailureSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// The directory had nobody on record. Not an error.
    NoRecipients,
    Delivered,
    PartiallyDelivered,
    NotDelivered,
}

/// Aggregated result of one `Dispatcher::send` call.
///
/// `attempted` is fixed when the report is created from the resolved
/// recipient set; `succeeded + failed` reaches it once every attempt has
/// been recorded. Only the first `max_failure_samples` failures keep
/// their details, the `failed` counter is always exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub target: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<FailureSample>,
    pub last_message_id: Option<String>,
    #[serde(skip)]
    max_failure_samples: usize,
}

impl DispatchReport {
    pub fn new(target: &str, attempted: usize, max_failure_samples: usize) -> Self {
        Self {
            target: target.to_string(),
            attempted,
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
            last_message_id: None,
            max_failure_samples,
        }
    }

    /// Record one attempt. Returns the failure details when it failed,
    /// whether or not they were kept as a sample.
    pub fn record(
        &mut self,
        address: &Address,
        outcome: DeliveryOutcome,
    ) -> Option<FailureSample> {
        match outcome {
            DeliveryOutcome::Delivered { message_id } => {
                self.succeeded += 1;
                self.last_message_id = Some(message_id);
                None
            }
            DeliveryOutcome::Failed { status, detail } => {
                self.failed += 1;
                let sample = FailureSample {
                    recipient: address.label(),
                    status,
                    detail,
                };
                if self.failures.len() < self.max_failure_samples {
                    self.failures.push(sample.clone());
                }
                Some(sample)
            }
        }
    }

    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn status(&self) -> DispatchStatus {
        if self.attempted == 0 {
            DispatchStatus::NoRecipients
        } else if self.failed == 0 {
            DispatchStatus::Delivered
        } else if self.succeeded == 0 {
            DispatchStatus::NotDelivered
        } else {
            DispatchStatus::PartiallyDelivered
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(s: &str) -> Address {
        Address::Token(s.to_string())
    }

    #[test]
    fn test_counts_and_status() {
        let mut report = DispatchReport::new("all recipients", 3, 20);
        report.record(
            &token("a"),
            DeliveryOutcome::Delivered {
                message_id: String::from("projects/p/messages/1"),
            },
        );
        report.record(&token("b"), DeliveryOutcome::failed(Some(404), "not found"));
        assert_eq!(report.completed(), 2);
        assert_eq!(report.status(), DispatchStatus::PartiallyDelivered);

        report.record(
            &token("c"),
            DeliveryOutcome::Delivered {
                message_id: String::from("projects/p/messages/3"),
            },
        );
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.completed(), report.attempted);
        assert_eq!(
            report.last_message_id.as_deref(),
            Some("projects/p/messages/3")
        );
    }

    #[test]
    fn test_failure_samples_are_capped() {
        let mut report = DispatchReport::new("all recipients", 10, 3);
        for i in 0..10 {
            let sample = report.record(
                &token(&format!("token-{}", i)),
                DeliveryOutcome::failed(Some(500), "boom"),
            );
            assert!(sample.is_some());
        }
        assert_eq!(report.failed, 10);
        assert_eq!(report.failures.len(), 3);
        assert_eq!(report.failures[0].recipient, "token-0");
        assert_eq!(report.status(), DispatchStatus::NotDelivered);
    }

    #[test]
    fn test_empty_report_means_no_recipients() {
        let report = DispatchReport::new("all recipients", 0, 20);
        assert_eq!(report.status(), DispatchStatus::NoRecipients);
    }
}
