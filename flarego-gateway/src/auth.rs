use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{GatewayError, Result};

/// Claims carried by a signed ingress token. No subject: the gateway only
/// cares that the token was issued by a trusted issuer and hasn't expired.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication mode, checked in precedence order: HMAC, then static
/// bearer, then open.
#[derive(Clone, Debug)]
pub enum AuthMode {
    Hmac { secret: String, issuer: String },
    Static(String),
    Open,
}

impl AuthMode {
    /// `token` is the bearer value with any `Bearer ` prefix already
    /// stripped by the caller.
    pub fn authenticate(&self, token: Option<&str>) -> Result<()> {
        match self {
            AuthMode::Hmac { secret, issuer } => {
                let token = token.ok_or(GatewayError::Unauthenticated)?;
                let data = jsonwebtoken::decode::<Claims>(
                    token,
                    &DecodingKey::from_secret(secret.as_bytes()),
                    &Validation::new(Algorithm::HS256),
                )
                .map_err(|_| GatewayError::PermissionDenied)?;
                if &data.claims.iss != issuer {
                    return Err(GatewayError::IssuerMismatch);
                }
                Ok(())
            }
            AuthMode::Static(expected) => {
                let token = token.ok_or(GatewayError::Unauthenticated)?;
                if constant_time_eq::constant_time_eq(token.as_bytes(), expected.as_bytes()) {
                    Ok(())
                } else {
                    Err(GatewayError::PermissionDenied)
                }
            }
            AuthMode::Open => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn sign(secret: &str, issuer: &str, exp_offset_secs: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: issuer.to_string(),
            exp: now + exp_offset_secs,
            iat: now,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn hmac_accepts_a_valid_token() {
        let mode = AuthMode::Hmac {
            secret: "s3cret".into(),
            issuer: "flarego-agent".into(),
        };
        let token = sign("s3cret", "flarego-agent", 60);
        assert!(mode.authenticate(Some(&token)).is_ok());
    }

    #[test]
    fn hmac_rejects_wrong_issuer() {
        let mode = AuthMode::Hmac {
            secret: "s3cret".into(),
            issuer: "flarego-agent".into(),
        };
        let token = sign("s3cret", "someone-else", 60);
        assert!(matches!(
            mode.authenticate(Some(&token)),
            Err(GatewayError::IssuerMismatch)
        ));
    }

    #[test]
    fn hmac_rejects_expired_token() {
        let mode = AuthMode::Hmac {
            secret: "s3cret".into(),
            issuer: "flarego-agent".into(),
        };
        let token = sign("s3cret", "flarego-agent", -60);
        assert!(matches!(
            mode.authenticate(Some(&token)),
            Err(GatewayError::PermissionDenied)
        ));
    }

    #[test]
    fn hmac_rejects_missing_token() {
        let mode = AuthMode::Hmac {
            secret: "s3cret".into(),
            issuer: "flarego-agent".into(),
        };
        assert!(matches!(
            mode.authenticate(None),
            Err(GatewayError::Unauthenticated)
        ));
    }

    #[test]
    fn static_bearer_matches_exactly() {
        let mode = AuthMode::Static("topsecret".into());
        assert!(mode.authenticate(Some("topsecret")).is_ok());
        assert!(matches!(
            mode.authenticate(Some("wrong")),
            Err(GatewayError::PermissionDenied)
        ));
    }

    #[test]
    fn open_accepts_anything() {
        assert!(AuthMode::Open.authenticate(None).is_ok());
    }
}
