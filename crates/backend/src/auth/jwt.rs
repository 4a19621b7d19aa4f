//! JWT token creation and validation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use super::types::{AuthConfig, Claims};

/// Tokens older than this are reissued on the next authenticated request
const REFRESH_AFTER_SECS: i64 = 86_400;

/// Create a new JWT token for a user.
pub fn create_token(
    config: &AuthConfig,
    email: &str,
    name: Option<String>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::days(config.token_duration_days);

    let claims = Claims {
        sub: email.to_string(),
        name,
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Validate a JWT token and return claims.
pub fn validate_token(
    config: &AuthConfig,
    token: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

pub fn should_refresh(claims: &Claims) -> bool {
    Utc::now().timestamp() - claims.iat > REFRESH_AFTER_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::test_config;

    #[test]
    fn test_token_round_trip_keeps_identity() {
        let config = test_config();
        let token = create_token(&config, "test@example.com", Some("Test User".to_string()))
            .expect("should create token");

        let claims = validate_token(&config, &token).expect("should validate token");
        assert_eq!(claims.sub, "test@example.com");
        assert_eq!(claims.name, Some("Test User".to_string()));
        assert!(!should_refresh(&claims));
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let config = test_config();
        let token = create_token(&config, "test@example.com", None).expect("should create token");

        let mut other = config;
        other.jwt_secret = "another-secret".to_string();
        assert!(validate_token(&other, &token).is_err());
        assert!(validate_token(&other, "garbage").is_err());
    }

    #[test]
    fn test_day_old_token_should_refresh() {
        let claims = Claims {
            sub: "test@example.com".to_string(),
            name: None,
            iat: Utc::now().timestamp() - REFRESH_AFTER_SECS - 60,
            exp: Utc::now().timestamp() + 3600,
        };
        assert!(should_refresh(&claims));
    }
}
