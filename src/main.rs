use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use logistics_relay_backend::services::audit_service::RETENTION_DAYS;
use logistics_relay_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware, routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    {
        let state = app_state.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
            loop {
                ticker.tick().await;
                if let Err(e) = state
                    .audit_service
                    .purge_older_than(chrono::Duration::days(RETENTION_DAYS))
                    .await
                {
                    tracing::error!("Audit retention sweep error: {:?}", e);
                }
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let webhook_api = Router::new()
        .route(
            "/webhooks/orders/paid",
            get(routes::orders_paid::order_paid_info).post(routes::orders_paid::handle_order_paid),
        )
        .route(
            "/api/logistics-webhook",
            post(routes::logistics_webhook::handle_logistics_event),
        )
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::new_rps_state(config.webhook_rps),
            middleware::rate_limit::rps_middleware,
        ));

    let admin_api = Router::new()
        .route("/api/logs", get(routes::logs::list_logs))
        .route("/api/logs/orders/:order_id", get(routes::logs::logs_for_order))
        .route(
            "/api/cleanup-audit-logs",
            get(routes::logs::cleanup_info).post(routes::logs::run_cleanup),
        )
        .route("/api/webhook-test", get(routes::logs::webhook_status))
        .layer(axum::middleware::from_fn(
            middleware::admin_auth::require_admin_token,
        ))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::new_rps_state(config.admin_rps),
            middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(webhook_api)
        .merge(admin_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
