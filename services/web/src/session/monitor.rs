//! services/web/src/session/monitor.rs
//!
//! Keeps a client's access token fresh by refreshing it shortly before it
//! expires. A single slot per client: `Idle` or `Armed` with one pending timer.
//! Arming always cancels the previous timer, and a cancelled timer never
//! touches the session again.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use edumynt_core::domain::Session;
use edumynt_core::ports::AuthProvider;
use edumynt_core::token::{decode_expiry, refresh_delay};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::state::{AuthEvent, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    Idle,
    Armed,
}

enum Slot {
    Idle,
    Armed {
        generation: u64,
        cancel: CancellationToken,
    },
}

struct SlotCell {
    slot: Slot,
    next_generation: u64,
}

#[derive(Clone)]
pub struct SessionMonitor {
    auth: Arc<dyn AuthProvider>,
    state: Arc<SessionState>,
    margin: chrono::Duration,
    cell: Arc<Mutex<SlotCell>>,
}

impl SessionMonitor {
    pub fn new(auth: Arc<dyn AuthProvider>, state: Arc<SessionState>, margin: chrono::Duration) -> Self {
        Self {
            auth,
            state,
            margin,
            cell: Arc::new(Mutex::new(SlotCell {
                slot: Slot::Idle,
                next_generation: 0,
            })),
        }
    }

    pub async fn status(&self) -> MonitorStatus {
        match self.cell.lock().await.slot {
            Slot::Idle => MonitorStatus::Idle,
            Slot::Armed { .. } => MonitorStatus::Armed,
        }
    }

    /// Reads the current session and schedules its refresh. Without a
    /// session nothing is scheduled and any pending timer is dropped.
    pub async fn activate(&self) -> MonitorStatus {
        match self.state.current().await {
            Some(session) => {
                let delay = delay_until_refresh(&session, self.margin);
                self.arm(delay).await;
                MonitorStatus::Armed
            }
            None => {
                self.cancel().await;
                MonitorStatus::Idle
            }
        }
    }

    /// Cancels any pending timer and returns to `Idle`.
    pub async fn cancel(&self) {
        let mut cell = self.cell.lock().await;
        if let Slot::Armed { cancel, .. } = std::mem::replace(&mut cell.slot, Slot::Idle) {
            cancel.cancel();
        }
    }

    async fn arm(&self, delay: Duration) {
        let mut cell = self.cell.lock().await;
        if let Slot::Armed { cancel, .. } = &cell.slot {
            cancel.cancel();
        }
        let generation = cell.next_generation;
        cell.next_generation += 1;
        let cancel = CancellationToken::new();
        cell.slot = Slot::Armed {
            generation,
            cancel: cancel.clone(),
        };
        drop(cell);

        // The countdown starts now, not when the task is first polled.
        let deadline = Instant::now() + delay;
        info!(delay_secs = delay.as_secs(), "Session refresh scheduled");
        let monitor = self.clone();
        tokio::spawn(async move { monitor.run(generation, cancel, deadline).await });
    }

    async fn run(self, generation: u64, cancel: CancellationToken, mut deadline: Instant) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep_until(deadline) => {}
            }

            let Some(current) = self.state.current().await else {
                warn!("Refresh timer fired without a session");
                break;
            };

            let refreshed = tokio::select! {
                _ = cancel.cancelled() => return,
                result = self.auth.refresh(&current.refresh_token) => result,
            };

            match refreshed {
                Ok(session) => {
                    // Commit under the slot lock so a concurrent cancel either
                    // wins entirely or sees the new session.
                    let cell = self.cell.lock().await;
                    if cancel.is_cancelled() {
                        return;
                    }
                    let delay = delay_until_refresh(&session, self.margin);
                    deadline = Instant::now() + delay;
                    self.state.establish(session, AuthEvent::TokenRefreshed).await;
                    drop(cell);
                    info!(next_delay_secs = delay.as_secs(), "Session refreshed proactively");
                }
                Err(e) => {
                    error!("Failed to refresh session: {}", e);
                    break;
                }
            }
        }

        let mut cell = self.cell.lock().await;
        if matches!(cell.slot, Slot::Armed { generation: g, .. } if g == generation) {
            cell.slot = Slot::Idle;
        }
    }
}

/// Prefers the expiry carried in the token; falls back to the stored one.
fn delay_until_refresh(session: &Session, margin: chrono::Duration) -> Duration {
    let expires_at = decode_expiry(&session.access_token).unwrap_or(session.expires_at);
    refresh_delay(expires_at, Utc::now(), margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{session_expiring_in, StubAuth};

    fn margin() -> chrono::Duration {
        chrono::Duration::minutes(5)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn no_session_schedules_nothing() {
        let auth = StubAuth::new();
        let state = Arc::new(SessionState::new());
        let monitor = SessionMonitor::new(auth.clone(), state, margin());

        assert_eq!(monitor.activate().await, MonitorStatus::Idle);
        tokio::time::advance(Duration::from_secs(3600)).await;
        settle().await;
        assert_eq!(auth.refresh_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_five_minutes_before_expiry_and_rearms() {
        let auth = StubAuth::new();
        let state = Arc::new(SessionState::new());
        state
            .establish(session_expiring_in(chrono::Duration::minutes(10)), AuthEvent::SignedIn)
            .await;
        let mut events = state.subscribe();
        let monitor = SessionMonitor::new(auth.clone(), state.clone(), margin());

        assert_eq!(monitor.activate().await, MonitorStatus::Armed);
        tokio::time::advance(Duration::from_secs(4 * 60)).await;
        settle().await;
        assert_eq!(auth.refresh_calls(), 0);

        tokio::time::advance(Duration::from_secs(61)).await;
        settle().await;
        assert_eq!(auth.refresh_calls(), 1);
        assert_eq!(events.recv().await.unwrap(), AuthEvent::TokenRefreshed);
        assert_eq!(monitor.status().await, MonitorStatus::Armed);
        assert_eq!(
            state.current().await.unwrap().refresh_token,
            "refresh-1",
            "refreshed session replaces the old one"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_token_refreshes_immediately() {
        let auth = StubAuth::new();
        let state = Arc::new(SessionState::new());
        state
            .establish(session_expiring_in(chrono::Duration::minutes(-30)), AuthEvent::SignedIn)
            .await;
        let monitor = SessionMonitor::new(auth.clone(), state, margin());

        monitor.activate().await;
        settle().await;
        assert_eq!(auth.refresh_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn activating_twice_keeps_one_timer() {
        let auth = StubAuth::new();
        let state = Arc::new(SessionState::new());
        state
            .establish(session_expiring_in(chrono::Duration::minutes(10)), AuthEvent::SignedIn)
            .await;
        let monitor = SessionMonitor::new(auth.clone(), state, margin());

        monitor.activate().await;
        monitor.activate().await;
        tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;
        settle().await;
        assert_eq!(auth.refresh_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let auth = StubAuth::new();
        let state = Arc::new(SessionState::new());
        state
            .establish(session_expiring_in(chrono::Duration::minutes(10)), AuthEvent::SignedIn)
            .await;
        let monitor = SessionMonitor::new(auth.clone(), state, margin());

        monitor.activate().await;
        monitor.cancel().await;
        assert_eq!(monitor.status().await, MonitorStatus::Idle);
        tokio::time::advance(Duration::from_secs(3600)).await;
        settle().await;
        assert_eq!(auth.refresh_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_stops_the_chain() {
        let auth = StubAuth::failing_refresh();
        let state = Arc::new(SessionState::new());
        state
            .establish(session_expiring_in(chrono::Duration::minutes(10)), AuthEvent::SignedIn)
            .await;
        let monitor = SessionMonitor::new(auth.clone(), state, margin());

        monitor.activate().await;
        tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;
        settle().await;
        assert_eq!(auth.refresh_calls(), 1);
        assert_eq!(monitor.status().await, MonitorStatus::Idle);

        tokio::time::advance(Duration::from_secs(24 * 3600)).await;
        settle().await;
        assert_eq!(auth.refresh_calls(), 1);
    }
}
