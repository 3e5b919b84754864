use std::{env, sync::Arc};

use anyhow::Context;
use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use billing_sync::{
    config::Config,
    db::{
        postgres_subscription_repository::PostgresSubscriptionRepository,
        postgres_usage_repository::PostgresUsageRepository,
        postgres_user_repository::PostgresUserRepository,
        postgres_webhook_event_repository::PostgresWebhookEventRepository,
    },
    routes,
    services::{
        billing::plan_resolver::PlanResolver,
        stripe::{LiveStripeService, StripeService},
    },
    utils::jwt::SessionTokenVerifier,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let sentry_guard = init_sentry();
    init_tracing(sentry_guard.is_some());

    let config = Config::from_env()?;

    let pool = establish_connection(&config.database_url).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let stripe = LiveStripeService::from_settings(&config.stripe)
        .map(|service| Arc::new(service) as Arc<dyn StripeService>);
    if stripe.is_none() {
        warn!("STRIPE_SECRET_KEY not set; checkout and portal sessions are disabled");
    }

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid origin")?,
        )
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        users: Arc::new(PostgresUserRepository { pool: pool.clone() }),
        subscriptions: Arc::new(PostgresSubscriptionRepository { pool: pool.clone() }),
        webhook_events: Arc::new(PostgresWebhookEventRepository { pool: pool.clone() }),
        usage: Arc::new(PostgresUsageRepository { pool }),
        stripe,
        plans: Arc::new(PlanResolver::new(config.prices.clone())),
        session_tokens: Arc::new(SessionTokenVerifier::from_config(&config)),
        config: Arc::new(config),
    };

    let app = routes::router(state).layer(cors);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "billing service listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = env::var("SENTRY_DSN").ok().filter(|v| !v.trim().is_empty())?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

fn init_tracing(with_sentry: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let (plain_layer, json_layer) = if json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(with_sentry.then(sentry_tracing::layer))
        .init();
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    info!("connected to the database");
    Ok(pool)
}
