//! crates/edumynt_core/src/route_guard.rs
//!
//! Classifies a navigated path and decides whether to let it through or
//! redirect, based only on whether the client has a session.

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const REDIRECT_PARAM: &str = "redirectTo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteClass {
    pub is_auth: bool,
    pub is_protected: bool,
    pub is_preview: bool,
}

impl RouteClass {
    /// Prefix tests are textual: `/courses` counts as protected because it
    /// starts with `/course`.
    pub fn of(path: &str) -> Self {
        Self {
            is_auth: path.starts_with("/auth/"),
            is_protected: ["/dashboard", "/course", "/lesson"]
                .iter()
                .any(|prefix| path.starts_with(prefix)),
            is_preview: path.contains("/preview"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// Rules, first match wins:
/// 1. preview paths pass,
/// 2. signed-in clients are sent from auth pages to the dashboard,
/// 3. anonymous clients are sent from protected pages to sign-in, keeping
///    the requested path as `redirectTo`,
/// 4. everything else passes.
pub fn evaluate(path: &str, has_session: bool) -> GuardDecision {
    let class = RouteClass::of(path);

    if class.is_preview {
        return GuardDecision::Allow;
    }
    if has_session && class.is_auth {
        return GuardDecision::Redirect(DASHBOARD_PATH.to_string());
    }
    if !has_session && class.is_protected {
        return GuardDecision::Redirect(sign_in_redirect(path));
    }
    GuardDecision::Allow
}

pub fn sign_in_redirect(return_to: &str) -> String {
    format!(
        "{}?{}={}",
        SIGN_IN_PATH,
        REDIRECT_PARAM,
        encode_query_value(return_to)
    )
}

/// Only accepts local absolute paths as post-sign-in targets.
pub fn safe_return_target(candidate: Option<&str>) -> String {
    match candidate {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => DASHBOARD_PATH.to_string(),
    }
}

// Path separators stay readable; anything that would end or split the query is escaped.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_dashboard_visit_goes_to_sign_in() {
        assert_eq!(
            evaluate("/dashboard", false),
            GuardDecision::Redirect("/auth/signin?redirectTo=/dashboard".to_string())
        );
    }

    #[test]
    fn signed_in_auth_page_visit_goes_to_dashboard() {
        assert_eq!(
            evaluate("/auth/signin", true),
            GuardDecision::Redirect("/dashboard".to_string())
        );
        assert_eq!(
            evaluate("/auth/forgot-password", true),
            GuardDecision::Redirect("/dashboard".to_string())
        );
    }

    #[test]
    fn preview_paths_always_pass() {
        for has_session in [true, false] {
            assert_eq!(evaluate("/course/abc/preview", has_session), GuardDecision::Allow);
            assert_eq!(evaluate("/auth/preview", has_session), GuardDecision::Allow);
        }
    }

    #[test]
    fn other_paths_pass_through() {
        assert_eq!(evaluate("/", false), GuardDecision::Allow);
        assert_eq!(evaluate("/settings", false), GuardDecision::Allow);
        assert_eq!(evaluate("/dashboard", true), GuardDecision::Allow);
        assert_eq!(evaluate("/auth/signup", false), GuardDecision::Allow);
    }

    #[test]
    fn protected_prefixes_are_textual() {
        assert!(RouteClass::of("/courses").is_protected);
        assert!(RouteClass::of("/lesson/42").is_protected);
        assert!(!RouteClass::of("/").is_protected);
        assert_eq!(
            evaluate("/lesson/a b", false),
            GuardDecision::Redirect("/auth/signin?redirectTo=/lesson/a%20b".to_string())
        );
    }

    #[test]
    fn return_targets_must_be_local() {
        assert_eq!(safe_return_target(Some("/course/1")), "/course/1");
        assert_eq!(safe_return_target(Some("https://evil.example")), "/dashboard");
        assert_eq!(safe_return_target(Some("//evil.example")), "/dashboard");
        assert_eq!(safe_return_target(None), "/dashboard");
    }
}
