use crate::plugin::Internal;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Whether a key is refreshing on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Active { period: Duration },
}

/// Handle to a running refresh timer.
///
/// The timer task sends a `Tick` on every period until the handle is
/// cancelled or dropped, so replacing a key's handle always stops the old one.
#[derive(Debug)]
pub struct RefreshTimer {
    id: u64,
    period: Duration,
    cancel_token: CancellationToken,
}

impl RefreshTimer {
    /// Spawn a timer whose first tick fires one `period` from now
    pub fn start(
        context: String,
        id: u64,
        period: Duration,
        ticks: mpsc::UnboundedSender<Internal>,
    ) -> Self {
        let cancel_token = CancellationToken::new();

        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let task_token = cancel_token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => {
                        debug!(context = %context, timer_id = id, "Refresh timer cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        let tick = Internal::Tick {
                            context: context.clone(),
                            timer_id: id,
                        };
                        if ticks.send(tick).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            id,
            period,
            cancel_token,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{assert, let_assert};
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let _timer = RefreshTimer::start("ctx".to_string(), 7, Duration::from_secs(5), tx);

        let_assert!(Ok(Some(Internal::Tick { context, timer_id })) =
            timeout(Duration::from_secs(6), rx.recv()).await);
        assert!(context == "ctx");
        assert!(timer_id == 7);
        assert!(start.elapsed() == Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = RefreshTimer::start("ctx".to_string(), 1, Duration::from_secs(1), tx.clone());
        drop(timer);

        assert!(timeout(Duration::from_secs(30), rx.recv()).await.is_err());
    }
}
