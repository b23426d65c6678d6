use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use keygate_backend::{
    config::Config,
    db::{connection::create_pool, redis::create_redis_pool},
    docs::ApiDoc,
    handlers,
    middleware::auth::require_auth,
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        port = config.port,
        database_url = %config.database_url,
        jwt_secret = %mask_secret(&config.jwt_secret),
        encryption_key = %mask_secret(&config.encryption_key),
        access_token_expiry = config.access_token_expiry,
        refresh_token_expiry = config.refresh_token_expiry,
        sso_callback_url = %config.sso_callback_url,
        "Loaded configuration from environment/.env"
    );

    // Initialize the durable store
    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Initialize the cache backend; fails fast when it is unreachable.
    let redis_pool = create_redis_pool(&config).await?;

    let state = AppState::build(config.clone(), pool, redis_pool)?;

    // Public routes; logout and validate do their own bearer handling.
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/sso/init", post(handlers::auth::sso_init))
        .route("/api/v1/auth/callback", get(handlers::auth::sso_callback))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route("/api/v1/tokens/validate", get(handlers::tokens::validate));

    // Routes behind the authenticated-request middleware.
    let protected_routes = Router::new()
        .route("/api/v1/tokens/info", get(handlers::tokens::info))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let cors = if state.config.cors_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origin = state
            .config
            .cors_origin
            .parse::<HeaderValue>()
            .map_err(|_| anyhow::anyhow!("Invalid CORS_ORIGIN value"))?;
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
