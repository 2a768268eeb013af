use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use super::models::{
    Address, DeliveryOutcome, DeliveryTarget, FailureSample, Message, topic_name,
};
use super::report::DispatchReport;
use crate::core::DispatchError;
use crate::google::{PushSender, RecipientDirectory};

const DEFAULT_PROGRESS_INTERVAL: usize = 5;
const DEFAULT_MAX_FAILURE_SAMPLES: usize = 20;

/// Progress notifications sent while a dispatch runs. They are advisory:
/// nothing waits on them and a dropped receiver is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Resolved { total: usize },
    Failed(FailureSample),
    Progress { completed: usize, total: usize },
}

/// Sends one message to a delivery target and tallies the outcomes.
///
/// Holds no per-call state, so concurrent `send` calls on the same
/// dispatcher never share a report or a credential. Deliveries within
/// one call are issued one at a time, in recipient order.
pub struct Dispatcher {
    directory: Arc<dyn RecipientDirectory>,
    sender: Arc<dyn PushSender>,
    progress_interval: usize,
    max_failure_samples: usize,
}

impl Dispatcher {
    pub fn new(directory: Arc<dyn RecipientDirectory>, sender: Arc<dyn PushSender>) -> Self {
        Self {
            directory,
            sender,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            max_failure_samples: DEFAULT_MAX_FAILURE_SAMPLES,
        }
    }

    pub fn with_progress_interval(mut self, every: usize) -> Self {
        self.progress_interval = every.max(1);
        self
    }

    pub fn with_max_failure_samples(mut self, max: usize) -> Self {
        self.max_failure_samples = max;
        self
    }

    pub async fn send(
        &self,
        message: &Message,
        target: &DeliveryTarget,
        events: Option<&UnboundedSender<DispatchEvent>>,
    ) -> Result<DispatchReport, DispatchError> {
        tracing::debug!("Validating notification for {}", target);
        message.validate()?;

        let addresses = self.resolve(target).await?;
        self.deliver(message, target, addresses, events).await
    }

    /// Send to addresses already resolved from `target`.
    ///
    /// Only an invalid message is an error here. Anything that goes wrong
    /// for one address, including a credential failure, is counted as a
    /// failed attempt and the remaining addresses are still tried.
    pub async fn deliver(
        &self,
        message: &Message,
        target: &DeliveryTarget,
        addresses: Vec<Address>,
        events: Option<&UnboundedSender<DispatchEvent>>,
    ) -> Result<DispatchReport, DispatchError> {
        message.validate()?;

        let total = addresses.len();
        let mut report =
            DispatchReport::new(&target.to_string(), total, self.max_failure_samples);
        emit(events, DispatchEvent::Resolved { total });

        if total == 0 {
            tracing::info!("No recipients on record, nothing to send");
            return Ok(report);
        }

        tracing::debug!("Sending to {} address(es)", total);
        for address in &addresses {
            let outcome = match self.sender.send(message, address).await {
                Ok(outcome) => outcome,
                Err(e) => DeliveryOutcome::failed(None, &e.to_string()),
            };

            if let Some(failure) = report.record(address, outcome) {
                tracing::warn!(
                    "Delivery to {} failed ({:?}): {}",
                    failure.recipient,
                    failure.status,
                    failure.detail
                );
                emit(events, DispatchEvent::Failed(failure));
            }

            let completed = report.completed();
            if completed % self.progress_interval == 0 || completed == total {
                emit(events, DispatchEvent::Progress { completed, total });
            }
        }

        tracing::info!(
            "Dispatch to {} completed: {} sent, {} failed",
            target,
            report.succeeded,
            report.failed
        );
        Ok(report)
    }

    /// Addresses a send to `target` would go to. Only `AllRecipients`
    /// touches the directory.
    pub async fn resolve(&self, target: &DeliveryTarget) -> Result<Vec<Address>, DispatchError> {
        match target {
            DeliveryTarget::AllRecipients => {
                tracing::debug!("Resolving recipients from the directory");
                let recipients = self.directory.list_all().await?;
                Ok(recipients.into_iter().map(Address::Token).collect())
            }
            DeliveryTarget::Topic { name } => Ok(vec![Address::Topic(topic_name(name)?)]),
            DeliveryTarget::SingleRecipient { token } => {
                let token = token.trim();
                if token.is_empty() {
                    return Err(DispatchError::Validation(String::from(
                        "recipient token is required",
                    )));
                }
                Ok(vec![Address::Token(token.to_string())])
            }
        }
    }
}

fn emit(events: Option<&UnboundedSender<DispatchEvent>>, event: DispatchEvent) {
    if let Some(tx) = events {
        // The receiver going away must not stop the dispatch
        let _ = tx.send(event);
    }
}
