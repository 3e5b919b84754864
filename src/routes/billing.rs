use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::models::{plan::ResourceKind, plan::SubscriptionTier};
use crate::responses::JsonResponse;
use crate::routes::auth::session::AuthSession;
use crate::services::billing::BillingError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalRequest {
    pub return_url: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitsQuery {
    pub resource: Option<String>,
}

pub async fn create_checkout(
    State(app_state): State<AppState>,
    AuthSession { user_id, .. }: AuthSession,
    Json(payload): Json<CheckoutRequest>,
) -> Response {
    match app_state
        .session_initiator()
        .create_checkout(
            user_id,
            &payload.price_id,
            &payload.success_url,
            &payload.cancel_url,
        )
        .await
    {
        Ok(session) => {
            Json(json!({ "sessionId": session.id, "url": session.url })).into_response()
        }
        Err(err) => {
            error!(%user_id, %err, "failed to create checkout session");
            err.into_response()
        }
    }
}

pub async fn create_portal(
    State(app_state): State<AppState>,
    AuthSession { user_id, .. }: AuthSession,
    Json(payload): Json<PortalRequest>,
) -> Response {
    match app_state
        .session_initiator()
        .create_portal(user_id, &payload.return_url)
        .await
    {
        Ok(session) => Json(json!({ "url": session.url })).into_response(),
        Err(err) => {
            if !matches!(err, BillingError::NoSubscription) {
                error!(%user_id, %err, "failed to create portal session");
            }
            err.into_response()
        }
    }
}

pub async fn get_limits(
    State(app_state): State<AppState>,
    AuthSession { user_id, .. }: AuthSession,
    Query(query): Query<LimitsQuery>,
) -> Response {
    let gate = app_state.usage_gate();

    let Some(raw) = query.resource else {
        return match gate.check_all(user_id).await {
            Ok(summary) => Json(summary).into_response(),
            Err(err) => BillingError::from(err).into_response(),
        };
    };

    let Some(resource) = ResourceKind::parse(&raw) else {
        return JsonResponse::error_with_code(
            StatusCode::BAD_REQUEST,
            &format!("Unknown resource: {raw}"),
            "invalid_resource",
        )
        .into_response();
    };

    match gate.check_limit(user_id, resource).await {
        Ok(check) => Json(check).into_response(),
        Err(err) => {
            error!(%user_id, resource = resource.as_str(), ?err, "limit check failed");
            BillingError::from(err).into_response()
        }
    }
}

pub async fn get_subscription(
    State(app_state): State<AppState>,
    AuthSession { user_id, .. }: AuthSession,
) -> Response {
    let user = match app_state.users.find_billing_user(user_id).await {
        Ok(user) => user,
        Err(err) => return BillingError::from(err).into_response(),
    };
    let subscription = match app_state.subscriptions.find_latest_for_user(user_id).await {
        Ok(sub) => sub,
        Err(err) => return BillingError::from(err).into_response(),
    };

    let tier = user
        .as_ref()
        .map(|u| u.tier())
        .unwrap_or(SubscriptionTier::Free);
    let status = user.and_then(|u| u.subscription_status);

    Json(json!({
        "tier": tier.as_str(),
        "status": status,
        "subscription": subscription,
    }))
    .into_response()
}
