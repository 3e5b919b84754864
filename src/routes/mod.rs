pub mod auth;
pub mod billing;
pub mod webhooks;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::responses::JsonResponse;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let billing_routes = Router::new()
        .route("/webhook", post(webhooks::stripe_webhook))
        .route("/webhook/alternate", post(webhooks::paddle_webhook))
        .route("/checkout", post(billing::create_checkout))
        .route("/portal", post(billing::create_portal))
        .route("/limits", get(billing::get_limits))
        .route("/subscription", get(billing::get_subscription));

    Router::new()
        .route("/health", get(health))
        .nest("/billing", billing_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Response {
    JsonResponse::success("ok").into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use time::OffsetDateTime;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::router;
    use crate::config::{Config, PaddleSettings, StripeSettings};
    use crate::db::{
        mock_db::{billing_user, MockDb},
        mock_webhook_event_repository::MockWebhookEventRepository,
        usage_repository::MockUsageRepository,
    };
    use crate::models::{plan::Plan, subscription::BillingProvider};
    use crate::services::billing::{
        plan_resolver::{PlanResolver, PriceCatalog},
        signature::test_support::{stripe_header, STRIPE_SECRET},
    };
    use crate::services::stripe::{MockStripeService, StripeService};
    use crate::state::AppState;
    use crate::utils::jwt::test_support::{access_token, verifier, AUDIENCE, ISSUER, SECRET};

    struct TestApp {
        state: AppState,
        db: Arc<MockDb>,
        events: MockWebhookEventRepository,
        stripe: MockStripeService,
    }

    impl TestApp {
        fn new(db: MockDb, usage: MockUsageRepository) -> Self {
            let catalog = PriceCatalog::default().with_prices(
                BillingProvider::Stripe,
                Plan::Individual,
                &["price_individual_monthly"],
            );
            let config = Config {
                database_url: "postgres://localhost/test".into(),
                frontend_origin: "http://localhost:5173".into(),
                bind_addr: "127.0.0.1:0".into(),
                jwt_secret: SECRET.into(),
                jwt_issuer: ISSUER.into(),
                jwt_audience: AUDIENCE.into(),
                stripe: StripeSettings {
                    secret_key: Some("sk_test".into()),
                    webhook_secret: Some(STRIPE_SECRET.into()),
                },
                paddle: PaddleSettings::default(),
                prices: catalog.clone(),
            };

            let db = Arc::new(db);
            let events = MockWebhookEventRepository::default();
            let stripe = MockStripeService::new();
            let state = AppState {
                users: db.clone(),
                subscriptions: db.clone(),
                webhook_events: Arc::new(events.clone()),
                usage: Arc::new(usage),
                stripe: Some(Arc::new(stripe.clone()) as Arc<dyn StripeService>),
                plans: Arc::new(PlanResolver::new(catalog)),
                config: Arc::new(config),
                session_tokens: Arc::new(verifier()),
            };
            Self {
                state,
                db,
                events,
                stripe,
            }
        }

        fn token(&self, user_id: Uuid) -> String {
            access_token(user_id)
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = router(self.state.clone()).oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }
    }

    fn authed(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn stripe_delivery(body: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/billing/webhook")
            .header(
                "Stripe-Signature",
                stripe_header(body, OffsetDateTime::now_utc().unix_timestamp()),
            )
            .body(Body::from(body.to_vec()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_success() {
        let app = TestApp::new(MockDb::default(), MockUsageRepository::new());
        let (status, body) = app
            .send(Request::get("/health").body(Body::empty()).unwrap())
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn webhook_without_signature_is_bad_request() {
        let app = TestApp::new(MockDb::default(), MockUsageRepository::new());
        let request = Request::post("/billing/webhook")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing Stripe-Signature");
        assert_eq!(app.events.len(), 0);
    }

    #[tokio::test]
    async fn webhook_replay_is_acknowledged_as_duplicate() {
        let user = Uuid::new_v4();
        let app = TestApp::new(
            MockDb::default().with_user(billing_user(user, None)),
            MockUsageRepository::new(),
        );
        let payload = serde_json::to_vec(&json!({
            "id": "evt_route_1",
            "type": "customer.subscription.created",
            "data": { "object": {
                "id": "sub_route",
                "customer": "cus_route",
                "status": "active",
                "metadata": { "user_id": user.to_string() },
                "items": { "data": [ { "price": { "id": "price_individual_monthly" } } ] }
            } }
        }))
        .unwrap();

        let (status, body) = app.send(stripe_delivery(&payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "received": true }));
        assert_eq!(
            app.db.user(user).unwrap().subscription_tier.as_deref(),
            Some("pro")
        );

        let (status, body) = app.send(stripe_delivery(&payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "received": true, "duplicate": true }));
        assert_eq!(app.db.subscription_count(), 1);
        assert_eq!(*app.db.upsert_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn alternate_webhook_without_secret_is_server_error() {
        let app = TestApp::new(MockDb::default(), MockUsageRepository::new());
        let request = Request::post("/billing/webhook/alternate")
            .header("Paddle-Signature", "ts=1;h1=00")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "billing_not_configured");
    }

    #[tokio::test]
    async fn checkout_requires_session() {
        let app = TestApp::new(MockDb::default(), MockUsageRepository::new());
        let request = Request::post("/billing/checkout")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "priceId": "price_individual_monthly", "successUrl": "a", "cancelUrl": "b" })
                    .to_string(),
            ))
            .unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(app.stripe.call_count(), 0);
    }

    #[tokio::test]
    async fn checkout_returns_session_for_known_price() {
        let user = Uuid::new_v4();
        let app = TestApp::new(
            MockDb::default().with_user(billing_user(user, None)),
            MockUsageRepository::new(),
        );
        let request = authed(
            "POST",
            "/billing/checkout",
            &app.token(user),
            Some(json!({
                "priceId": "price_individual_monthly",
                "successUrl": "https://app.test/ok",
                "cancelUrl": "https://app.test/cancel"
            })),
        );

        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["sessionId"].as_str().unwrap().starts_with("cs_test_"));
        assert_eq!(app.stripe.call_count(), 1);
    }

    #[tokio::test]
    async fn checkout_rejects_unknown_price() {
        let user = Uuid::new_v4();
        let app = TestApp::new(MockDb::default(), MockUsageRepository::new());
        let request = authed(
            "POST",
            "/billing/checkout",
            &app.token(user),
            Some(json!({ "priceId": "price_nope", "successUrl": "a", "cancelUrl": "b" })),
        );
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_price_id");
        assert_eq!(app.stripe.call_count(), 0);
    }

    #[tokio::test]
    async fn portal_without_customer_is_no_subscription() {
        let user = Uuid::new_v4();
        let app = TestApp::new(
            MockDb::default().with_user(billing_user(user, Some("pro"))),
            MockUsageRepository::new(),
        );
        let request = authed(
            "POST",
            "/billing/portal",
            &app.token(user),
            Some(json!({ "returnUrl": "https://app.test/account" })),
        );
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "no_subscription");
    }

    #[tokio::test]
    async fn single_resource_limit_is_reported() {
        let user = Uuid::new_v4();
        let mut usage = MockUsageRepository::new();
        usage.expect_count_active_devices().returning(|_| Ok(2));
        let app = TestApp::new(
            MockDb::default().with_user(billing_user(user, Some("free"))),
            usage,
        );

        let (status, body) = app
            .send(authed("GET", "/billing/limits?resource=devices", &app.token(user), None))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "allowed": false, "current": 2, "limit": 2 }));
    }

    #[tokio::test]
    async fn all_limits_are_reported_without_resource() {
        let user = Uuid::new_v4();
        let mut usage = MockUsageRepository::new();
        usage.expect_count_active_devices().returning(|_| Ok(0));
        usage.expect_count_team_vaults().returning(|_| Ok(0));
        usage.expect_count_team_members().returning(|_| Ok(0));
        let app = TestApp::new(MockDb::default(), usage);

        let (status, body) = app
            .send(authed("GET", "/billing/limits", &app.token(user), None))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["plan"], "free");
        assert_eq!(body["teamMembers"]["limit"], 0);
        assert_eq!(body["storage"]["current"], 0);
    }

    #[tokio::test]
    async fn unknown_resource_is_rejected() {
        let user = Uuid::new_v4();
        let app = TestApp::new(MockDb::default(), MockUsageRepository::new());
        let (status, body) = app
            .send(authed("GET", "/billing/limits?resource=widgets", &app.token(user), None))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_resource");
    }

    #[tokio::test]
    async fn subscription_summary_defaults_to_free() {
        let user = Uuid::new_v4();
        let app = TestApp::new(MockDb::default(), MockUsageRepository::new());
        let (status, body) = app
            .send(authed("GET", "/billing/subscription", &app.token(user), None))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tier"], "free");
        assert!(body["subscription"].is_null());
    }
}
