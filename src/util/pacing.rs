/// Request pacing for upstream rate limits

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::core::errors::TrackerError;

/// Enforces a minimum gap between successive calls to one collaborator.
///
/// The gap doubles (up to `max_interval`) each time the upstream throttles us and
/// drops back to the base interval after the next successful call.
#[derive(Debug)]
pub struct Pacer {
    name: &'static str,
    base_interval: Duration,
    max_interval: Duration,
    state: Mutex<PacerState>,
}

#[derive(Debug)]
struct PacerState {
    last_call: Option<Instant>,
    current_interval: Duration,
}

impl Pacer {
    pub fn new(name: &'static str, base_interval: Duration) -> Self {
        Self::with_max(name, base_interval, base_interval.saturating_mul(16))
    }

    pub fn with_max(name: &'static str, base_interval: Duration, max_interval: Duration) -> Self {
        Self {
            name,
            base_interval,
            max_interval: max_interval.max(base_interval),
            state: Mutex::new(PacerState {
                last_call: None,
                current_interval: base_interval,
            }),
        }
    }

    /// Wait until the next call is allowed, then claim the slot. The first call
    /// never waits.
    pub async fn wait_turn(&self) {
        let mut state = self.state.lock().await;

        if let Some(last) = state.last_call {
            let ready_at = last + state.current_interval;
            if ready_at > Instant::now() {
                debug!(pacer = self.name, wait_ms = (ready_at - Instant::now()).as_millis() as u64, "Pacing upstream call");
                sleep_until(ready_at).await;
            }
        }

        state.last_call = Some(Instant::now());
    }

    /// Feed the outcome of a paced call back into the policy. The next gap is
    /// measured from here, the end of the call.
    pub async fn record<T>(&self, outcome: &Result<T, TrackerError>) {
        let mut state = self.state.lock().await;
        state.last_call = Some(Instant::now());

        match outcome {
            Err(TrackerError::UpstreamStatus { status: 429, .. }) => {
                let widened = state.current_interval.saturating_mul(2).min(self.max_interval);
                if widened != state.current_interval {
                    warn!(pacer = self.name, interval_ms = widened.as_millis() as u64, "Upstream throttling, widening pacing interval");
                }
                state.current_interval = widened;
            }
            Ok(_) => {
                state.current_interval = self.base_interval;
            }
            Err(_) => {}
        }
    }

    pub async fn current_interval(&self) -> Duration {
        self.state.lock().await.current_interval
    }
}

/// Bound a collaborator call so a hung upstream only costs that one call.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, TrackerError>
where
    F: Future<Output = Result<T, TrackerError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(TrackerError::TransientFetch(format!("call timed out after {:?}", limit))),
    }
}
