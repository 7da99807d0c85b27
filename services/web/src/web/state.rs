//! services/web/src/web/state.rs
//!
//! Defines the application's shared state and the per-request session view.

use std::sync::Arc;

use edumynt_core::domain::{Session, User};
use edumynt_core::ports::{AuthProvider, CourseStore};

use crate::config::Config;
use crate::session::{AuthFacade, ClientSession, SessionRegistry};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CourseStore>,
    pub sessions: Arc<SessionRegistry>,
    pub facade: Arc<AuthFacade>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn CourseStore>, auth: Arc<dyn AuthProvider>, config: Arc<Config>) -> Self {
        Self {
            store,
            sessions: Arc::new(
                SessionRegistry::new(auth.clone(), config.refresh_margin)
                    .with_idle_timeout(config.session_idle_timeout),
            ),
            facade: Arc::new(AuthFacade::new(auth, config.password_reset_redirect())),
            config,
        }
    }
}

//=========================================================================================
// CurrentSession (Resolved Once Per Request)
//=========================================================================================

/// What the route guard resolved from the cookie. Inserted into request
/// extensions for page handlers.
#[derive(Clone, Default)]
pub struct CurrentSession {
    pub client: Option<Arc<ClientSession>>,
    pub session: Option<Session>,
}

impl CurrentSession {
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}
