//! crates/edumynt_core/src/auth_messages.rs
//!
//! Maps the auth service's wire error strings to stable, user-facing text.

pub const UNEXPECTED: &str = "An unexpected error occurred. Please try again.";

const MESSAGES: &[(&str, &str)] = &[
    (
        "Invalid login credentials",
        "Invalid email or password. Please check your credentials and try again.",
    ),
    (
        "Email not confirmed",
        "Please check your email and click the confirmation link before signing in.",
    ),
    (
        "User already registered",
        "An account with this email already exists. Please sign in instead.",
    ),
    (
        "Password should be at least 6 characters",
        "Password must be at least 6 characters long.",
    ),
    (
        "Unable to validate email address: invalid format",
        "Please enter a valid email address.",
    ),
    (
        "Signup is disabled",
        "Account registration is currently disabled. Please contact support.",
    ),
    (
        "Email rate limit exceeded",
        "Too many emails sent. Please wait a few minutes before trying again.",
    ),
];

/// Exact match only. Unknown messages are returned unchanged; an empty one
/// becomes the generic fallback.
pub fn user_message(wire: &str) -> String {
    if wire.is_empty() {
        return UNEXPECTED.to_string();
    }
    MESSAGES
        .iter()
        .find(|(from, _)| *from == wire)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or_else(|| wire.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_messages_are_translated() {
        assert_eq!(
            user_message("Invalid login credentials"),
            "Invalid email or password. Please check your credentials and try again."
        );
        assert_eq!(
            user_message("Email rate limit exceeded"),
            "Too many emails sent. Please wait a few minutes before trying again."
        );
    }

    #[test]
    fn unknown_messages_pass_through() {
        assert_eq!(user_message("Database on fire"), "Database on fire");
        // exact match, no normalisation
        assert_eq!(user_message("invalid login credentials"), "invalid login credentials");
    }

    #[test]
    fn empty_message_gets_fallback() {
        assert_eq!(user_message(""), UNEXPECTED);
    }
}
