use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::responses::JsonResponse;
use crate::services::stripe::StripeServiceError;

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("billing is not configured: {0}")]
    Configuration(String),
    #[error("Missing {0}")]
    MissingSignature(&'static str),
    #[error("webhook signature verification failed")]
    Signature,
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),
    #[error("price {0} is not available for checkout")]
    UnknownPriceId(String),
    #[error("no billing account on file")]
    NoSubscription,
    #[error("{0}")]
    ProviderCall(String),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl BillingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::MissingSignature(_)
            | BillingError::Signature
            | BillingError::MalformedPayload(_)
            | BillingError::UnknownPriceId(_)
            | BillingError::NoSubscription => StatusCode::BAD_REQUEST,
            BillingError::Configuration(_)
            | BillingError::ProviderCall(_)
            | BillingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            BillingError::Configuration(_) => "billing_not_configured",
            BillingError::MissingSignature(_) => "missing_signature",
            BillingError::Signature => "invalid_signature",
            BillingError::MalformedPayload(_) => "malformed_payload",
            BillingError::UnknownPriceId(_) => "invalid_price_id",
            BillingError::NoSubscription => "no_subscription",
            BillingError::ProviderCall(_) => "provider_error",
            BillingError::Storage(_) => "storage_error",
        }
    }
}

impl From<StripeServiceError> for BillingError {
    fn from(err: StripeServiceError) -> Self {
        match err {
            StripeServiceError::Api(msg) | StripeServiceError::Other(msg) => {
                BillingError::ProviderCall(msg)
            }
        }
    }
}

impl IntoResponse for BillingError {
    fn into_response(self) -> Response {
        // Storage details stay in the logs.
        let message = match &self {
            BillingError::Storage(_) => "Internal error".to_string(),
            other => other.to_string(),
        };
        JsonResponse::error_with_code(self.status_code(), &message, self.code()).into_response()
    }
}
