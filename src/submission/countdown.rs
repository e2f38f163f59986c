//! Success-screen countdown that redirects home unless cancelled

use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownOutcome {
    /// Countdown finished; navigate to the route
    Redirect(String),
    /// User left the success screen before it finished
    Cancelled,
}

/// Cancels the paired countdown. Dropping it without calling `cancel`
/// lets the countdown run to completion.
pub struct CountdownCanceller(oneshot::Sender<()>);

impl CountdownCanceller {
    pub fn cancel(self) {
        let _ = self.0.send(());
    }
}

pub struct RedirectCountdown {
    seconds: u64,
    target: String,
    period: Duration,
    cancel: oneshot::Receiver<()>,
}

impl RedirectCountdown {
    pub fn new(seconds: u64, target: impl Into<String>) -> (Self, CountdownCanceller) {
        let (tx, rx) = oneshot::channel();
        let countdown = Self {
            seconds,
            target: target.into(),
            period: Duration::from_secs(1),
            cancel: rx,
        };
        (countdown, CountdownCanceller(tx))
    }

    /// Length of one tick (one second unless overridden)
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Call `on_tick` with the seconds remaining, once per tick, then
    /// resolve to the redirect.
    pub async fn run(self, mut on_tick: impl FnMut(u64) + Send) -> CountdownOutcome {
        let RedirectCountdown {
            seconds,
            target,
            period,
            mut cancel,
        } = self;
        let mut cancel_open = true;

        for remaining in (1..=seconds).rev() {
            on_tick(remaining);
            let sleep = tokio::time::sleep(period);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    () = &mut sleep => break,
                    result = &mut cancel, if cancel_open => {
                        if result.is_ok() {
                            debug!(remaining, "Redirect countdown cancelled");
                            return CountdownOutcome::Cancelled;
                        }
                        // Canceller dropped: keep counting
                        cancel_open = false;
                    }
                }
            }
        }

        // A cancel that raced the last tick still wins
        if cancel_open && cancel.try_recv().is_ok() {
            return CountdownOutcome::Cancelled;
        }

        debug!(route = %target, "Redirect countdown finished");
        CountdownOutcome::Redirect(target)
    }
}
