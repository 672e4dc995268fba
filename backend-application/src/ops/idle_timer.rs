use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Inactivity deadline for the local scan server.
///
/// `touch` pushes the deadline out by one window; `cancel` disarms it so that
/// any waiter on [`IdleTimer::expired`] returns `false`.
pub struct IdleTimer {
    window: Duration,
    deadline: watch::Sender<Option<Instant>>,
}

impl IdleTimer {
    pub fn new(window: Duration) -> Self {
        let (deadline, _rx) = watch::channel(Some(Instant::now() + window));
        Self { window, deadline }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Current deadline, `None` once cancelled.
    pub fn deadline(&self) -> Option<Instant> {
        *self.deadline.borrow()
    }

    pub fn touch(&self) {
        self.deadline.send_if_modified(|deadline| {
            if deadline.is_none() {
                return false;
            }
            *deadline = Some(Instant::now() + self.window);
            true
        });
    }

    pub fn cancel(&self) {
        self.deadline.send_replace(None);
    }

    /// Resolves `true` once the deadline passes without a touch, or `false`
    /// if the timer is cancelled first.
    pub async fn expired(&self) -> bool {
        let mut rx = self.deadline.subscribe();
        loop {
            let current = *rx.borrow_and_update();
            let Some(deadline) = current else {
                return false;
            };
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    if rx.has_changed().unwrap_or(false) {
                        continue;
                    }
                    return true;
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}
