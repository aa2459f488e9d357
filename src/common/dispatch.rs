//! Sequential, paced dispatch of outbound calls.
//!
//! The call-initiation service is rate-limited per caller, so a batch is
//! processed one target at a time with a fixed delay between targets. One
//! target's failure is recorded and never stops the rest of the batch.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lets a failure say whether resubmitting the same target could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// One recipient and what to deliver to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallTarget<P> {
    pub recipient: String,
    pub payload: P,
}

impl<P> CallTarget<P> {
    pub fn new(recipient: impl Into<String>, payload: P) -> Self {
        Self {
            recipient: recipient.into(),
            payload,
        }
    }
}

/// Outcome for a single target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CallResult<R> {
    Success {
        recipient: String,
        response: R,
    },
    #[serde(rename = "error")]
    Failure {
        recipient: String,
        error: String,
        retryable: bool,
    },
}

impl<R> CallResult<R> {
    pub fn recipient(&self) -> &str {
        match self {
            CallResult::Success { recipient, .. } | CallResult::Failure { recipient, .. } => {
                recipient
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success { .. })
    }
}

/// Results of one batch, in input order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchReport<R> {
    pub batch_id: Uuid,
    pub results: Vec<CallResult<R>>,
}

impl<R> BatchReport<R> {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// True when the batch was non-empty and nothing went through.
    pub fn is_total_failure(&self) -> bool {
        !self.results.is_empty() && self.succeeded() == 0
    }

    /// Builds a follow-up batch holding only the targets whose failure was
    /// classified as retryable. `targets` must be the batch that produced
    /// this report.
    pub fn retry_batch<P: Clone>(&self, targets: &[CallTarget<P>]) -> Vec<CallTarget<P>> {
        self.results
            .iter()
            .zip(targets)
            .filter(|(result, _)| matches!(result, CallResult::Failure { retryable: true, .. }))
            .map(|(_, target)| target.clone())
            .collect()
    }
}

/// Delivers a batch strictly in order, pausing `delay` between targets.
#[derive(Clone, Debug)]
pub struct BatchDispatcher {
    delay: Duration,
}

impl BatchDispatcher {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `initiate` once per target and collects every outcome.
    ///
    /// The pause applies between every adjacent pair whatever the previous
    /// outcome was, and never after the last target.
    pub async fn dispatch<P, R, E, F, Fut>(
        &self,
        targets: &[CallTarget<P>],
        mut initiate: F,
    ) -> BatchReport<R>
    where
        F: FnMut(&CallTarget<P>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Display + Retryable,
    {
        let batch_id = Uuid::new_v4();
        let total = targets.len();
        let mut results = Vec::with_capacity(total);

        info!(%batch_id, total, delay_ms = self.delay.as_millis() as u64, "Dispatching call batch");

        for (index, target) in targets.iter().enumerate() {
            let result = match initiate(target).await {
                Ok(response) => {
                    info!(%batch_id, index, recipient = %target.recipient, "Call initiated");
                    CallResult::Success {
                        recipient: target.recipient.clone(),
                        response,
                    }
                }
                Err(err) => {
                    let retryable = err.is_retryable();
                    warn!(
                        %batch_id,
                        index,
                        recipient = %target.recipient,
                        retryable,
                        "Call failed: {}",
                        err
                    );
                    CallResult::Failure {
                        recipient: target.recipient.clone(),
                        error: err.to_string(),
                        retryable,
                    }
                }
            };
            results.push(result);

            if index + 1 < total {
                debug!(%batch_id, "Waiting {:?} before next call", self.delay);
                sleep(self.delay).await;
            }
        }

        let report = BatchReport { batch_id, results };
        info!(
            %batch_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Call batch completed"
        );
        report
    }
}
