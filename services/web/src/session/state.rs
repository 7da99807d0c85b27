//! services/web/src/session/state.rs
//!
//! The single owned container for one client's session, with change
//! notifications broadcast to any interested listener.

use chrono::{DateTime, Utc};
use edumynt_core::domain::{Session, User};
use tokio::sync::{broadcast, RwLock};
use tracing::info;

/// Auth-state changes, in the order they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

pub struct SessionState {
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            current: RwLock::new(None),
            events,
        }
    }

    /// The stored session, expired or not.
    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// The stored session if its access token is still valid at `now`.
    pub async fn active(&self, now: DateTime<Utc>) -> Option<Session> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|s| s.expires_at > now)
            .cloned()
    }

    pub async fn user(&self) -> Option<User> {
        self.active(Utc::now()).await.map(|s| s.user)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Stores a new session. Only the auth façade and the monitor's refresh
    /// step call this.
    pub(crate) async fn establish(&self, session: Session, event: AuthEvent) {
        info!(user_id = %session.user.id, ?event, "Session updated");
        *self.current.write().await = Some(session);
        // no receivers is fine
        let _ = self.events.send(event);
    }

    pub(crate) async fn clear(&self) -> Option<Session> {
        let previous = self.current.write().await.take();
        if previous.is_some() {
            info!("User signed out");
            let _ = self.events.send(AuthEvent::SignedOut);
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn session(expires_at: DateTime<Utc>) -> Session {
        Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at,
            user: User {
                id: Uuid::new_v4(),
                email: "learner@example.com".to_string(),
                full_name: None,
            },
        }
    }

    #[tokio::test]
    async fn establish_and_clear_notify_subscribers() {
        let state = SessionState::new();
        let mut events = state.subscribe();

        state
            .establish(session(Utc::now() + Duration::hours(1)), AuthEvent::SignedIn)
            .await;
        assert!(state.user().await.is_some());
        assert!(state.clear().await.is_some());
        assert!(state.current().await.is_none());

        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn);
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
    }

    #[tokio::test]
    async fn clearing_an_empty_state_is_silent() {
        let state = SessionState::new();
        let mut events = state.subscribe();
        assert!(state.clear().await.is_none());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn expired_sessions_are_not_active() {
        let state = SessionState::new();
        let now = Utc::now();
        state
            .establish(session(now - Duration::seconds(1)), AuthEvent::SignedIn)
            .await;
        assert!(state.current().await.is_some());
        assert!(state.active(now).await.is_none());
    }
}
