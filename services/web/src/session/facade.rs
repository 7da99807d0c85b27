//! services/web/src/session/facade.rs
//!
//! The auth façade: sign-up, sign-in, sign-out and password reset with one
//! uniform result shape. Nothing here returns `Err`; failures become a
//! user-readable message.

use std::sync::Arc;

use edumynt_core::auth_messages::{user_message, UNEXPECTED};
use edumynt_core::domain::{Session, User};
use edumynt_core::ports::{AuthError, AuthProvider};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use super::registry::ClientSession;
use super::state::AuthEvent;

/// `{ success: true, data? }` or `{ success: false, error }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> AuthResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// The identity fields exposed to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SignUpData {
    pub user: UserSummary,
    /// True when the account must be confirmed by email before signing in.
    pub confirmation_required: bool,
}

fn describe(error: &AuthError) -> String {
    match error {
        AuthError::Rejected(message) => user_message(message),
        AuthError::Transport(_) => UNEXPECTED.to_string(),
    }
}

/// The old timer is cancelled first so an in-flight refresh cannot write the
/// previous session over the new one.
async fn start_session(client: &ClientSession, session: Session) {
    client.monitor.cancel().await;
    client.state.establish(session, AuthEvent::SignedIn).await;
    client.monitor.activate().await;
}

pub struct AuthFacade {
    auth: Arc<dyn AuthProvider>,
    reset_redirect: String,
}

impl AuthFacade {
    pub fn new(auth: Arc<dyn AuthProvider>, reset_redirect: impl Into<String>) -> Self {
        Self {
            auth,
            reset_redirect: reset_redirect.into(),
        }
    }

    pub async fn sign_up(
        &self,
        client: &ClientSession,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> AuthResponse<SignUpData> {
        match self.auth.sign_up(email, password, full_name).await {
            Ok(outcome) => {
                let user = UserSummary::from(&outcome.user);
                let confirmation_required = outcome.session.is_none();
                if let Some(session) = outcome.session {
                    start_session(client, session).await;
                }
                info!(user_id = %user.id, confirmation_required, "User signed up");
                AuthResponse::ok(SignUpData {
                    user,
                    confirmation_required,
                })
            }
            Err(e) => {
                error!("Sign-up failed: {}", e);
                AuthResponse::failed(describe(&e))
            }
        }
    }

    pub async fn sign_in(&self, client: &ClientSession, email: &str, password: &str) -> AuthResponse<UserSummary> {
        match self.auth.sign_in(email, password).await {
            Ok(session) => {
                let user = UserSummary::from(&session.user);
                start_session(client, session).await;
                info!(user_id = %user.id, "User signed in");
                AuthResponse::ok(user)
            }
            Err(e) => {
                error!("Sign-in failed: {}", e);
                AuthResponse::failed(describe(&e))
            }
        }
    }

    /// Clears the local session even when the remote call fails.
    pub async fn sign_out(&self, client: &ClientSession) -> AuthResponse<()> {
        client.monitor.cancel().await;
        let Some(session) = client.state.clear().await else {
            return AuthResponse::done();
        };
        match self.auth.sign_out(&session.access_token).await {
            Ok(()) => AuthResponse::done(),
            Err(e) => {
                error!("Sign-out failed: {}", e);
                AuthResponse::failed(describe(&e))
            }
        }
    }

    pub async fn reset_password(&self, email: &str) -> AuthResponse<()> {
        match self.auth.reset_password(email, &self.reset_redirect).await {
            Ok(()) => AuthResponse::done(),
            Err(e) => {
                error!("Password reset request failed: {}", e);
                AuthResponse::failed(describe(&e))
            }
        }
    }
}
