pub mod facade;
pub mod monitor;
pub mod registry;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use facade::{AuthFacade, AuthResponse, SignUpData, UserSummary};
pub use monitor::{MonitorStatus, SessionMonitor};
pub use registry::{ClientSession, SessionRegistry};
pub use state::{AuthEvent, SessionState};
