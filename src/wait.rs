//! Wait coordinator - poll a condition until it holds or time runs out

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::error::{Result, WebStepError};

/// Reason reported when a wait has none of its own
const DEFAULT_REASON: &str = "condition";

/// One wait: how long, and what for
#[derive(Debug, Clone, PartialEq)]
pub struct WaitSpec {
    pub timeout: Duration,
    pub reason: Option<String>,
}

impl WaitSpec {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            reason: None,
        }
    }

    pub fn secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or(DEFAULT_REASON)
    }
}

/// Polls predicates at a fixed interval under a timeout
#[derive(Debug, Clone)]
pub struct WaitCoordinator {
    poll_interval: Duration,
}

impl WaitCoordinator {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Block until `predicate` yields `true`.
    ///
    /// Fails with `WaitTimeout(reason)` once `spec.timeout` elapses. An error
    /// from the predicate ends the wait immediately.
    pub async fn wait_until<F, Fut>(&self, spec: &WaitSpec, mut predicate: F) -> Result<()>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<bool>> + Send,
    {
        if spec.timeout.is_zero() {
            return Err(WebStepError::InvalidWait {
                reason: format!("zero timeout waiting for {}", spec.reason()),
            });
        }

        let started = Instant::now();
        let poll_interval = self.poll_interval;
        debug!(reason = spec.reason(), timeout_ms = spec.timeout.as_millis() as u64, "waiting");

        let polled = timeout(spec.timeout, async {
            loop {
                if predicate().await? {
                    return Ok::<(), WebStepError>(());
                }
                sleep(poll_interval).await;
            }
        })
        .await;

        match polled {
            Ok(Ok(())) => {
                info!(
                    reason = spec.reason(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "wait satisfied"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(reason = spec.reason(), error = %e, "wait condition failed");
                Err(e)
            }
            Err(_) => {
                warn!(
                    reason = spec.reason(),
                    timeout_ms = spec.timeout.as_millis() as u64,
                    "wait timed out"
                );
                Err(WebStepError::WaitTimeout {
                    reason: spec.reason().to_string(),
                })
            }
        }
    }
}
