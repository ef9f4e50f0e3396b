//! Outcome notifier
//!
//! Delivers a [`NotificationPayload`] to the caller-supplied evaluation URL.
//! Failed attempts are retried after a capped exponential delay until the next
//! attempt would start past the wall-clock budget. Delivery failure is never an
//! error to the caller; it is reported as [`NotifyOutcome::Abandoned`].

mod backoff;
mod transport;

pub use backoff::BackoffSchedule;
pub use pagesmith_utils::error::NotifyError;
pub use transport::{CallbackTransport, HttpCallbackTransport};

use pagesmith_config::NotifyConfig;
use pagesmith_utils::types::NotificationPayload;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Result of a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// No destination was supplied
    Skipped,
    Delivered { attempts: u32 },
    /// Budget exhausted without a successful delivery
    Abandoned { attempts: u32, last_error: String },
}

impl NotifyOutcome {
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

impl fmt::Display for NotifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::Delivered { attempts } => write!(f, "delivered after {attempts} attempt(s)"),
            Self::Abandoned {
                attempts,
                last_error,
            } => write!(f, "abandoned after {attempts} attempt(s): {last_error}"),
        }
    }
}

/// Delivers notifications with retry.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn CallbackTransport>,
    initial_delay: Duration,
    max_delay: Duration,
    budget: Duration,
    attempt_timeout: Duration,
}

impl Notifier {
    /// Build a notifier that posts over HTTP.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Transport` if the HTTP client cannot be constructed.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let transport = HttpCallbackTransport::new(config.request_timeout)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    #[must_use]
    pub fn with_transport(transport: Arc<dyn CallbackTransport>, config: &NotifyConfig) -> Self {
        Self {
            transport,
            initial_delay: config.initial_delay,
            max_delay: config.max_delay,
            budget: config.budget,
            attempt_timeout: config.request_timeout,
        }
    }

    /// Deliver `payload` to `destination`, retrying within the budget.
    ///
    /// The payload is sent unchanged on every attempt.
    pub async fn notify(
        &self,
        destination: Option<&str>,
        payload: &NotificationPayload,
    ) -> NotifyOutcome {
        let Some(url) = destination.map(str::trim).filter(|u| !u.is_empty()) else {
            info!(task = %payload.task, round = payload.round, "No evaluation URL; skipping notification");
            return NotifyOutcome::Skipped;
        };

        let started = Instant::now();
        let mut delays = BackoffSchedule::new(self.initial_delay, self.max_delay);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let error = match self.attempt(url, payload).await {
                Ok(()) => {
                    info!(url, attempts, "Notification delivered");
                    return NotifyOutcome::Delivered { attempts };
                }
                Err(e) => e,
            };

            let delay = delays.next().unwrap_or(self.max_delay);
            let next_start = started.elapsed() + delay;
            if next_start > self.budget {
                warn!(
                    url,
                    attempts,
                    budget_secs = self.budget.as_secs(),
                    error = %error,
                    "Abandoning notification"
                );
                return NotifyOutcome::Abandoned {
                    attempts,
                    last_error: error.to_string(),
                };
            }

            warn!(
                url,
                attempt = attempts,
                retry_in_ms = delay.as_millis() as u64,
                error = %error,
                "Notification attempt failed"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, url: &str, payload: &NotificationPayload) -> Result<(), NotifyError> {
        debug!(url, "Posting notification");
        match tokio::time::timeout(self.attempt_timeout, self.transport.deliver(url, payload)).await
        {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Transport(format!(
                "no answer within {:?}",
                self.attempt_timeout
            ))),
        }
    }
}
