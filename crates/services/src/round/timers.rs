use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::controller::{ArmTimer, TimerTicket};

/// Runs feedback timers as tokio sleeps that report back over a channel.
///
/// A fired timer only delivers its ticket; the owner feeds it to the round
/// controller, which decides whether it still matters. Cancelling aborts the
/// sleep so nothing is delivered at all.
pub struct FeedbackTimers {
    tx: mpsc::UnboundedSender<TimerTicket>,
    armed: HashMap<TimerTicket, JoinHandle<()>>,
}

impl FeedbackTimers {
    /// Create the driver and the receiver fired tickets arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerTicket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                armed: HashMap::new(),
            },
            rx,
        )
    }

    /// Start `timer`. Re-arming the same ticket restarts it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&mut self, timer: ArmTimer) {
        self.cancel(timer.ticket);
        let tx = self.tx.clone();
        let ArmTimer { ticket, delay } = timer;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // receiver gone means the game loop ended
            let _ = tx.send(ticket);
        });
        self.armed.insert(ticket, handle);
    }

    pub fn arm_all(&mut self, timers: impl IntoIterator<Item = ArmTimer>) {
        for timer in timers {
            self.arm(timer);
        }
    }

    pub fn cancel(&mut self, ticket: TimerTicket) {
        if let Some(handle) = self.armed.remove(&ticket) {
            handle.abort();
            debug!(?ticket, "feedback timer cancelled");
        }
    }

    pub fn cancel_many(&mut self, tickets: impl IntoIterator<Item = TimerTicket>) {
        for ticket in tickets {
            self.cancel(ticket);
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.armed.drain() {
            handle.abort();
        }
    }

    /// Forget a ticket that has been delivered.
    pub fn acknowledge(&mut self, ticket: TimerTicket) {
        self.armed.remove(&ticket);
    }

    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}

impl Drop for FeedbackTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::round::controller::{RoundId, TimerKind};

    fn timer(round: u64, kind: TimerKind, ms: u64) -> ArmTimer {
        ArmTimer {
            ticket: TimerTicket {
                round: RoundId::new(round),
                kind,
            },
            delay: Duration::from_millis(ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timers_fire_in_delay_order() {
        let (mut timers, mut rx) = FeedbackTimers::new();
        let primary = timer(1, TimerKind::Primary, 800);
        let fallback = timer(1, TimerKind::Fallback, 1_800);
        timers.arm_all([fallback, primary]);

        assert_eq!(rx.recv().await, Some(primary.ticket));
        assert_eq!(rx.recv().await, Some(fallback.ticket));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timers_never_deliver() {
        let (mut timers, mut rx) = FeedbackTimers::new();
        let primary = timer(1, TimerKind::Primary, 800);
        let fallback = timer(1, TimerKind::Fallback, 1_800);
        timers.arm_all([primary, fallback]);
        timers.cancel(primary.ticket);

        assert_eq!(rx.recv().await, Some(fallback.ticket));

        timers.arm(timer(2, TimerKind::Primary, 800));
        timers.cancel_all();
        assert_eq!(timers.armed_count(), 0);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
