//! services/web/src/adapters/supabase_auth.rs
//!
//! This module contains the adapter for the hosted auth service (the GoTrue
//! REST API behind Supabase). It implements the `AuthProvider` port from the
//! `core` crate.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use edumynt_core::domain::{Session, User};
use edumynt_core::ports::{AuthError, AuthProvider, AuthResult, SignUpOutcome};
use edumynt_core::token::decode_expiry;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `AuthProvider` port over HTTP.
#[derive(Clone)]
pub struct SupabaseAuthAdapter {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseAuthAdapter {
    /// Creates a new `SupabaseAuthAdapter` for `<project_url>/auth/v1`.
    pub fn new(client: Client, project_url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: format!("{}/auth/v1", project_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
        }
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
    }

    async fn send(&self, request: RequestBuilder) -> AuthResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AuthError::Rejected(error_message(&body, status.as_u16())))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> AuthResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| AuthError::Transport(format!("unexpected auth response: {}", e)))
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct UserBody {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Deserialize, Default)]
struct UserMetadata {
    #[serde(default)]
    full_name: Option<String>,
}

impl From<UserBody> for User {
    fn from(body: UserBody) -> Self {
        User {
            id: body.id,
            email: body.email.unwrap_or_default(),
            full_name: body.user_metadata.full_name,
        }
    }
}

#[derive(Deserialize)]
struct SessionBody {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserBody,
}

impl From<SessionBody> for Session {
    fn from(body: SessionBody) -> Self {
        // The token's own claim wins; the envelope fields are fallbacks.
        let expires_at = decode_expiry(&body.access_token)
            .ok()
            .or_else(|| body.expires_at.and_then(|ts| Utc.timestamp_opt(ts, 0).single()))
            .unwrap_or_else(|| Utc::now() + Duration::seconds(body.expires_in.unwrap_or(3600)));
        Session {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_at,
            user: body.user.into(),
        }
    }
}

/// Sign-up answers with a session when email confirmation is off, and with
/// the bare user when it is on.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session(SessionBody),
    User(UserBody),
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// Pulls the human-readable message out of an error response.
fn error_message(body: &str, status: u16) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| {
            warn!("Auth service returned {} without a message", status);
            String::new()
        })
}

//=========================================================================================
// `AuthProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthProvider for SupabaseAuthAdapter {
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> AuthResult<SignUpOutcome> {
        let request = self.post("/signup").json(&json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        }));
        Ok(match self.send_json::<SignUpBody>(request).await? {
            SignUpBody::Session(body) => {
                let session = Session::from(body);
                SignUpOutcome {
                    user: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpBody::User(body) => SignUpOutcome {
                user: body.into(),
                session: None,
            },
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        let request = self
            .post("/token?grant_type=password")
            .json(&json!({ "email": email, "password": password }));
        Ok(self.send_json::<SessionBody>(request).await?.into())
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        self.send(self.post("/logout").bearer_auth(access_token)).await?;
        Ok(())
    }

    async fn reset_password(&self, email: &str, redirect_to: &str) -> AuthResult<()> {
        let request = self
            .post("/recover")
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }));
        self.send(request).await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<Session> {
        let request = self
            .post("/token?grant_type=refresh_token")
            .json(&json!({ "refresh_token": refresh_token }));
        Ok(self.send_json::<SessionBody>(request).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_msg_then_message() {
        assert_eq!(
            error_message(r#"{"code":400,"msg":"Invalid login credentials"}"#, 400),
            "Invalid login credentials"
        );
        assert_eq!(
            error_message(r#"{"message":"Email rate limit exceeded"}"#, 429),
            "Email rate limit exceeded"
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#, 400),
            "Email not confirmed"
        );
        assert_eq!(error_message("<html>bad gateway</html>", 502), "");
    }

    #[test]
    fn sign_up_body_distinguishes_session_from_user() {
        let with_session = r#"{
            "access_token": "not-a-jwt",
            "refresh_token": "r1",
            "expires_in": 3600,
            "expires_at": 1900000000,
            "user": {"id": "6f1c2d9e-4b3a-4c2d-8e1f-0a9b8c7d6e5f", "email": "a@b.co",
                     "user_metadata": {"full_name": "Asha"}}
        }"#;
        match serde_json::from_str::<SignUpBody>(with_session).unwrap() {
            SignUpBody::Session(body) => {
                let session = Session::from(body);
                assert_eq!(session.expires_at.timestamp(), 1_900_000_000);
                assert_eq!(session.user.full_name.as_deref(), Some("Asha"));
            }
            SignUpBody::User(_) => panic!("expected a session"),
        }

        let user_only = r#"{"id": "6f1c2d9e-4b3a-4c2d-8e1f-0a9b8c7d6e5f", "email": "a@b.co"}"#;
        assert!(matches!(
            serde_json::from_str::<SignUpBody>(user_only).unwrap(),
            SignUpBody::User(_)
        ));
    }

    #[test]
    fn base_url_points_at_auth_v1() {
        let adapter = SupabaseAuthAdapter::new(Client::new(), "https://demo.supabase.co/", "anon");
        assert_eq!(adapter.base_url, "https://demo.supabase.co/auth/v1");
    }
}
