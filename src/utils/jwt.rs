//! Verification of session tokens minted by the account service. Tokens are
//! never issued here.

use std::fmt;

use jsonwebtoken::{decode, errors::Error, Algorithm, DecodingKey, Validation};

use crate::config::Config;
use crate::routes::auth::claims::Claims;

pub struct SessionTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for SessionTokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenVerifier")
            .field("iss", &self.validation.iss)
            .field("aud", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

impl SessionTokenVerifier {
    /// `secret` is expected to have passed config validation already.
    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            &config.jwt_issuer,
            &config.jwt_audience,
        )
    }

    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        decode::<Claims>(token, &self.key, &self.validation).map(|data| data.claims)
    }
}

/// Router state that can check session tokens.
pub trait SessionTokenSource {
    fn session_tokens(&self) -> &SessionTokenVerifier;
}
