//! crates/edumynt_core/src/token.rs
//!
//! Reads the expiry out of an access token and computes when to refresh it.
//! The token is issued and verified by the auth service; only its payload is
//! read here, so the signature is not checked.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

/// Default lead time, in seconds, before expiry at which a session is refreshed.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 5 * 60;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed access token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),
    #[error("access token expiry {0} is out of range")]
    ExpiryOutOfRange(i64),
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

pub fn decode_expiry(access_token: &str) -> Result<DateTime<Utc>, TokenError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaim>(access_token, &DecodingKey::from_secret(&[]), &validation)?;
    Utc.timestamp_opt(data.claims.exp, 0)
        .single()
        .ok_or(TokenError::ExpiryOutOfRange(data.claims.exp))
}

/// `max(expires_at - now - margin, 0)`.
pub fn refresh_delay(
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    margin: Duration,
) -> std::time::Duration {
    (expires_at - now - margin)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: i64,
    }

    fn margin() -> Duration {
        Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS)
    }

    fn token_expiring_at(exp: DateTime<Utc>) -> String {
        let claims = Claims {
            sub: "user".to_string(),
            exp: exp.timestamp(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"issuer-secret")).unwrap()
    }

    #[test]
    fn expiry_is_read_without_the_signing_key() {
        let exp = Utc.timestamp_opt(1_900_000_000, 0).unwrap();
        assert_eq!(decode_expiry(&token_expiring_at(exp)).unwrap(), exp);
    }

    #[test]
    fn expired_tokens_still_decode() {
        let exp = Utc::now() - Duration::hours(2);
        let decoded = decode_expiry(&token_expiring_at(exp)).unwrap();
        assert_eq!(decoded.timestamp(), exp.timestamp());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_expiry("not-a-token").is_err());
        assert!(decode_expiry("a.b.c").is_err());
    }

    #[test]
    fn ten_minutes_left_refreshes_in_five() {
        let now = Utc::now();
        let delay = refresh_delay(now + Duration::minutes(10), now, margin());
        assert_eq!(delay, std::time::Duration::from_secs(5 * 60));
    }

    #[test]
    fn expired_or_nearly_expired_refreshes_immediately() {
        let now = Utc::now();
        assert_eq!(
            refresh_delay(now - Duration::minutes(1), now, margin()),
            std::time::Duration::ZERO
        );
        assert_eq!(
            refresh_delay(now + Duration::minutes(3), now, margin()),
            std::time::Duration::ZERO
        );
    }
}
