//! Test doubles for the auth port.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use edumynt_core::domain::{Session, User};
use edumynt_core::ports::{AuthError, AuthProvider, AuthResult, SignUpOutcome};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use tokio::sync::Notify;
use uuid::Uuid;

pub const GOOD_PASSWORD: &str = "correct-horse";

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: i64,
}

pub fn learner() -> User {
    User {
        id: Uuid::from_u128(0xabc),
        email: "learner@example.com".to_string(),
        full_name: Some("Asha Learner".to_string()),
    }
}

pub fn session_expiring_in(ttl: Duration) -> Session {
    session_for(learner(), ttl, "refresh-0")
}

fn session_for(user: User, ttl: Duration, refresh_token: &str) -> Session {
    let expires_at = Utc::now() + ttl;
    let claims = Claims {
        sub: user.id.to_string(),
        exp: expires_at.timestamp(),
    };
    let access_token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"stub"))
        .expect("encode stub token");
    Session {
        access_token,
        refresh_token: refresh_token.to_string(),
        expires_at,
        user,
    }
}

#[derive(Default)]
pub struct StubAuth {
    refreshes: AtomicUsize,
    fail_refresh: bool,
    refresh_gate: Option<Arc<Notify>>,
    pub reset_requests: Mutex<Vec<(String, String)>>,
    pub sign_outs: AtomicUsize,
}

impl StubAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_refresh() -> Arc<Self> {
        Arc::new(Self {
            fail_refresh: true,
            ..Self::default()
        })
    }

    /// Every refresh waits on the returned gate before answering.
    pub fn blocking_refresh() -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let auth = Arc::new(Self {
            refresh_gate: Some(gate.clone()),
            ..Self::default()
        });
        (auth, gate)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for StubAuth {
    async fn sign_up(&self, email: &str, _password: &str, full_name: &str) -> AuthResult<SignUpOutcome> {
        if email == "taken@example.com" {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: Some(full_name.to_string()),
        };
        let session = (!email.starts_with("confirm"))
            .then(|| session_for(user.clone(), Duration::hours(1), "refresh-0"));
        Ok(SignUpOutcome { user, session })
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        if email == "offline@example.com" {
            return Err(AuthError::Transport("connection refused".to_string()));
        }
        if password != GOOD_PASSWORD {
            return Err(AuthError::Rejected("Invalid login credentials".to_string()));
        }
        let user = User {
            email: email.to_string(),
            ..learner()
        };
        Ok(session_for(user, Duration::hours(1), "refresh-0"))
    }

    async fn sign_out(&self, _access_token: &str) -> AuthResult<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reset_password(&self, email: &str, redirect_to: &str) -> AuthResult<()> {
        self.reset_requests
            .lock()
            .expect("reset log")
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn refresh(&self, _refresh_token: &str) -> AuthResult<Session> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.refresh_gate {
            gate.notified().await;
        }
        if self.fail_refresh {
            return Err(AuthError::Rejected("Invalid Refresh Token".to_string()));
        }
        Ok(session_for(learner(), Duration::minutes(10), &format!("refresh-{}", n)))
    }
}
