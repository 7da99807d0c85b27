//! services/web/src/web/forms.rs
//!
//! Request bodies for the auth actions and their field validation. A body
//! that fails validation never reaches the auth backend.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if email.trim().is_empty() {
        errors.push(FieldError {
            field: "email",
            message: "Email is required",
        });
    } else if !is_email(email.trim()) {
        errors.push(FieldError {
            field: "email",
            message: "Please enter a valid email address",
        });
    }
}

fn into_result(errors: Vec<FieldError>) -> Result<(), Vec<FieldError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    /// Page to return to after signing in.
    #[serde(default, rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

impl SignInForm {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        if self.password.is_empty() {
            errors.push(FieldError {
                field: "password",
                message: "Password is required",
            });
        }
        into_result(errors)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.full_name.trim().chars().count() < MIN_NAME_LEN {
            errors.push(FieldError {
                field: "full_name",
                message: "Full name must be at least 2 characters",
            });
        }
        check_email(&self.email, &mut errors);
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(FieldError {
                field: "password",
                message: "Password must be at least 6 characters",
            });
        }
        if self.password != self.confirm_password {
            errors.push(FieldError {
                field: "confirm_password",
                message: "Passwords don't match",
            });
        }
        into_result(errors)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl ForgotPasswordForm {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        into_result(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(result: Result<(), Vec<FieldError>>) -> Vec<&'static str> {
        result.err().unwrap_or_default().iter().map(|e| e.field).collect()
    }

    #[test]
    fn email_pattern_accepts_plain_addresses_only() {
        assert!(is_email("ada@example.com"));
        assert!(is_email("first.last+tag@mail.example.org"));
        assert!(!is_email("a@b"));
        assert!(!is_email("two words@example.com"));
        assert!(!is_email("no-at-sign.example.com"));
    }

    #[test]
    fn sign_in_needs_a_valid_email_and_a_password() {
        let form = SignInForm {
            email: "learner@example.com".into(),
            password: "x".into(),
            redirect_to: None,
        };
        assert!(form.validate().is_ok());

        let form = SignInForm {
            email: "not-an-email".into(),
            password: String::new(),
            redirect_to: None,
        };
        assert_eq!(fields(form.validate()), vec!["email", "password"]);
    }

    #[test]
    fn sign_up_checks_every_field() {
        let form = SignUpForm {
            full_name: "A".into(),
            email: "a@b".into(),
            password: "12345".into(),
            confirm_password: "123456".into(),
        };
        assert_eq!(
            fields(form.validate()),
            vec!["full_name", "email", "password", "confirm_password"]
        );

        let form = SignUpForm {
            full_name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn empty_email_is_required_not_invalid() {
        let form = ForgotPasswordForm { email: "  ".into() };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors[0].message, "Email is required");
    }
}
