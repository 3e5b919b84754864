use std::env;

use crate::models::{plan::Plan, subscription::BillingProvider};
use crate::services::billing::plan_resolver::PriceCatalog;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// HS256 needs at least 256 bits of key material.
pub const MIN_SECRET_LENGTH: usize = 32;
/// Catches placeholder secrets such as a repeated character.
pub const MIN_DISTINCT_SECRET_BYTES: usize = 8;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} must be at least {required} bytes long (got {actual})")]
    SecretTooShort {
        key: &'static str,
        actual: usize,
        required: usize,
    },
    #[error("{key} must contain at least {required} distinct bytes (got {actual})")]
    SecretLowEntropy {
        key: &'static str,
        actual: usize,
        required: usize,
    },
}

fn validate_secret(key: &'static str, secret: &str) -> Result<(), ConfigError> {
    let actual = secret.len();
    if actual < MIN_SECRET_LENGTH {
        return Err(ConfigError::SecretTooShort {
            key,
            actual,
            required: MIN_SECRET_LENGTH,
        });
    }

    let mut seen = [false; 256];
    for byte in secret.bytes() {
        seen[usize::from(byte)] = true;
    }
    let distinct = seen.iter().filter(|hit| **hit).count();
    if distinct < MIN_DISTINCT_SECRET_BYTES {
        return Err(ConfigError::SecretLowEntropy {
            key,
            actual: distinct,
            required: MIN_DISTINCT_SECRET_BYTES,
        });
    }
    Ok(())
}

#[derive(Clone, Debug, Default)]
pub struct StripeSettings {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PaddleSettings {
    pub webhook_secret: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub bind_addr: String,
    /// Shared HS256 secret for session tokens; checked by `validate_secret`.
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub stripe: StripeSettings,
    pub paddle: PaddleSettings,
    pub prices: PriceCatalog,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        // Provider secrets are optional at startup; the routes report them missing per request.
        let optional = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let jwt_secret = required("JWT_SECRET")?.trim().to_string();
        validate_secret("JWT_SECRET", &jwt_secret)?;

        let mut prices = PriceCatalog::default();
        for provider in [BillingProvider::Stripe, BillingProvider::Paddle] {
            for plan in Plan::PAID {
                let key = format!(
                    "{}_PRICES_{}",
                    provider.as_str().to_uppercase(),
                    plan.as_str().to_uppercase()
                );
                if let Some(raw) = optional(&key) {
                    prices.insert_all(provider, plan, raw.split(','));
                }
            }
        }

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            frontend_origin: required("FRONTEND_ORIGIN")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret,
            jwt_issuer: required("JWT_ISSUER")?,
            jwt_audience: required("JWT_AUDIENCE")?,
            stripe: StripeSettings {
                secret_key: optional("STRIPE_SECRET_KEY"),
                webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
            },
            paddle: PaddleSettings {
                webhook_secret: optional("PADDLE_WEBHOOK_SECRET"),
            },
            prices,
        })
    }
}
