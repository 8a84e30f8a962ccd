//! Network quiescence detection from request lifecycle events.
//!
//! Counts in-flight requests from the driver's event stream and resolves once
//! the count has stayed at or below a threshold for a configured quiet
//! period, bounded by a hard timeout. The count is a heuristic built from a
//! racy, partially ordered stream: finish events may arrive for requests the
//! subscriber never saw start, and the quiet window must restart whenever
//! traffic resumes.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use crate::domain::ports::NetworkEvent;

/// Outcome of a quiescence wait.
///
/// Neither variant is an error: `TimedOut` means "probably idle" and callers
/// treat it as a best-effort signal, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuiescenceOutcome {
    /// Traffic stayed at or below the threshold for the full quiet period.
    Settled,
    /// The hard timeout elapsed with traffic still in flight.
    TimedOut,
}

/// Effect of a finish/fail event on the quiet timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettleEffect {
    /// The event had no matching start; the count is untouched.
    Ignored,
    /// The count dropped but is still above the threshold.
    Decremented,
    /// The count dropped to exactly the threshold; the quiet window restarts.
    ReachedThreshold,
}

/// In-flight request accounting, floored at zero.
///
/// One instance exists per detection attempt and is discarded with it.
#[derive(Debug)]
struct InflightCounter {
    inflight: u32,
    threshold: u32,
}

impl InflightCounter {
    const fn new(threshold: u32) -> Self {
        Self {
            inflight: 0,
            threshold,
        }
    }

    /// Apply a request start. Returns true when the count now exceeds the
    /// threshold and any pending quiet timer must be disarmed.
    fn on_started(&mut self) -> bool {
        self.inflight += 1;
        self.inflight > self.threshold
    }

    /// Apply a request finish or failure.
    fn on_settled(&mut self) -> SettleEffect {
        if self.inflight == 0 {
            return SettleEffect::Ignored;
        }
        self.inflight -= 1;
        if self.inflight == self.threshold {
            SettleEffect::ReachedThreshold
        } else {
            SettleEffect::Decremented
        }
    }

    const fn inflight(&self) -> u32 {
        self.inflight
    }
}

/// Detects network quiescence on a page's event stream.
///
/// Instances are created fresh per wait and consumed by it; the subscription
/// ends when the wait resolves, whichever way it resolves.
pub struct QuiescenceDetector {
    events: broadcast::Receiver<NetworkEvent>,
}

impl QuiescenceDetector {
    /// Create a detector over a network event subscription.
    pub const fn new(events: broadcast::Receiver<NetworkEvent>) -> Self {
        Self { events }
    }

    /// Wait until traffic has stayed at or below `max_inflight` for
    /// `quiet_period`, or until `hard_timeout` elapses, whichever comes
    /// first.
    ///
    /// The quiet window is armed immediately: zero requests are in flight at
    /// call time, so an already-idle page settles after one quiet period.
    pub async fn await_quiescence(
        mut self,
        quiet_period: Duration,
        hard_timeout: Duration,
        max_inflight: u32,
    ) -> QuiescenceOutcome {
        let mut counter = InflightCounter::new(max_inflight);

        let deadline = sleep(hard_timeout);
        tokio::pin!(deadline);
        let quiet = sleep(quiet_period);
        tokio::pin!(quiet);
        let mut quiet_armed = true;
        let mut stream_open = true;

        loop {
            tokio::select! {
                () = &mut deadline => {
                    debug!(
                        inflight = counter.inflight(),
                        "quiescence wait hit hard timeout"
                    );
                    return QuiescenceOutcome::TimedOut;
                }
                () = &mut quiet, if quiet_armed => {
                    trace!("network traffic settled");
                    return QuiescenceOutcome::Settled;
                }
                event = self.events.recv(), if stream_open => match event {
                    Ok(NetworkEvent::RequestStarted) => {
                        if counter.on_started() {
                            quiet_armed = false;
                        }
                    }
                    Ok(NetworkEvent::RequestFinished | NetworkEvent::RequestFailed) => {
                        match counter.on_settled() {
                            SettleEffect::Ignored => {
                                trace!("finish event with no request in flight, ignoring");
                            }
                            SettleEffect::ReachedThreshold => {
                                quiet.as_mut().reset(Instant::now() + quiet_period);
                                quiet_armed = true;
                            }
                            SettleEffect::Decremented => {}
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "network event stream lagged, in-flight count may drift");
                    }
                    Err(RecvError::Closed) => {
                        debug!("network event stream closed");
                        stream_open = false;
                    }
                },
            }
        }
    }
}
