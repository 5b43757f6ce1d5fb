//! Fixed-interval refresh loops.
//!
//! Every collection gets its own loop; loops share nothing but the shutdown
//! signal. A loop awaits its own fetch before the next tick, so it never
//! overlaps itself. Missed ticks are delayed rather than bunched.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::ClientResult;

pub struct Poller {
    period: Duration,
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Poller {
    pub fn new(period: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            period,
            shutdown,
            tasks: Vec::new(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Starts a loop that calls `tick` immediately and then every period.
    pub fn spawn<F, Fut>(&mut self, label: &'static str, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ClientResult<()>> + Send + 'static,
    {
        let period = self.period;
        let mut shutdown = self.shutdown.subscribe();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(label, period_secs = period.as_secs_f64(), "poll loop started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown.changed() => break,
                }

                tokio::select! {
                    res = tick() => {
                        if let Err(e) = res {
                            debug!(label, "poll tick failed: {e}");
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }

            info!(label, "poll loop stopped");
        });

        self.tasks.push((label, handle));
    }

    /// Signals every loop and waits for them to exit. In-flight requests are
    /// dropped.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for (label, handle) in self.tasks {
            if let Err(e) = handle.await {
                debug!(label, "poll task ended abnormally: {e}");
            }
        }
    }
}
