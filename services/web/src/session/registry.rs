//! services/web/src/session/registry.rs
//!
//! Maps the opaque client id carried in the session cookie to that client's
//! session state and refresh monitor.
//!
//! Browsers rarely say goodbye, so slots are swept: a slot nobody has looked
//! up for the idle timeout is closed, and so is one whose session lapsed with
//! no refresh pending.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use edumynt_core::domain::Session;
use edumynt_core::ports::AuthProvider;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::monitor::{MonitorStatus, SessionMonitor};
use super::state::SessionState;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(12 * 3600);
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A slot without a session survives this long, so a sign-in that is
/// still talking to the backend keeps its fresh slot.
const SIGNED_OUT_GRACE: Duration = Duration::from_secs(60);

/// One browser's slot: its session container and the monitor that keeps it fresh.
pub struct ClientSession {
    pub id: Uuid,
    pub state: Arc<SessionState>,
    pub monitor: SessionMonitor,
    last_seen: Mutex<Instant>,
}

impl ClientSession {
    /// The session if it is still valid now.
    pub async fn active_session(&self) -> Option<Session> {
        self.state.active(Utc::now()).await
    }

    async fn touch(&self) {
        *self.last_seen.lock().await = Instant::now();
    }

    async fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_seen.lock().await)
    }

    async fn is_stale(&self, now: Instant, idle_timeout: Duration) -> bool {
        let idle = self.idle_for(now).await;
        if idle >= idle_timeout {
            return true;
        }
        idle >= SIGNED_OUT_GRACE
            && self.active_session().await.is_none()
            && self.monitor.status().await == MonitorStatus::Idle
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("malformed client id '{0}'")]
    MalformedId(String),
}

pub struct SessionRegistry {
    auth: Arc<dyn AuthProvider>,
    refresh_margin: chrono::Duration,
    idle_timeout: Duration,
    clients: RwLock<HashMap<Uuid, Arc<ClientSession>>>,
}

impl SessionRegistry {
    pub fn new(auth: Arc<dyn AuthProvider>, refresh_margin: chrono::Duration) -> Self {
        Self {
            auth,
            refresh_margin,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Creates a fresh, signed-out client slot.
    pub async fn open(&self) -> Arc<ClientSession> {
        let state = Arc::new(SessionState::new());
        let client = Arc::new(ClientSession {
            id: Uuid::new_v4(),
            monitor: SessionMonitor::new(self.auth.clone(), state.clone(), self.refresh_margin),
            state,
            last_seen: Mutex::new(Instant::now()),
        });
        self.clients.write().await.insert(client.id, client.clone());
        debug!(client_id = %client.id, "Client session opened");
        client
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<ClientSession>> {
        self.clients.read().await.get(&id).cloned()
    }

    /// Resolves a raw cookie value. Unknown ids are `Ok(None)`.
    pub async fn lookup(&self, raw_id: &str) -> Result<Option<Arc<ClientSession>>, LookupError> {
        let id = Uuid::parse_str(raw_id).map_err(|_| LookupError::MalformedId(raw_id.to_string()))?;
        let client = self.get(id).await;
        if let Some(client) = &client {
            client.touch().await;
        }
        Ok(client)
    }

    /// The active session behind a cookie value. A failed lookup is logged
    /// and reads as "no session".
    pub async fn active_session(&self, raw_id: Option<&str>) -> Option<Session> {
        let raw_id = raw_id?;
        match self.lookup(raw_id).await {
            Ok(Some(client)) => client.active_session().await,
            Ok(None) => None,
            Err(e) => {
                warn!("Session lookup failed: {}", e);
                None
            }
        }
    }

    /// Tears a client down: its timer is cancelled before the slot is dropped.
    pub async fn close(&self, id: Uuid) {
        let removed = self.clients.write().await.remove(&id);
        if let Some(client) = removed {
            client.monitor.cancel().await;
            client.state.clear().await;
            debug!(client_id = %id, "Client session closed");
        }
    }

    /// Closes every stale slot and returns how many went.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let clients: Vec<Arc<ClientSession>> = self.clients.read().await.values().cloned().collect();
        let mut evicted = 0;
        for client in clients {
            if client.is_stale(now, self.idle_timeout).await {
                self.close(client.id).await;
                evicted += 1;
            }
        }
        evicted
    }

    /// Runs `sweep` every `every` until `shutdown` fires.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(?every, "Session sweeper started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Session sweeper stopped");
                        break;
                    }
                    _ = tokio::time::sleep(every) => {
                        match self.sweep().await {
                            0 => {}
                            n => {
                                let remaining = self.len().await;
                                info!(evicted = n, remaining, "Idle client sessions swept")
                            }
                        }
                    }
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
