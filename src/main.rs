use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use integration_service::config::AppConfig;
use integration_service::idempotency::IdempotencyStore;
use integration_service::odoo::jsonrpc::OdooJsonRpcClient;
use integration_service::repo::dlq_repo::DlqRepo;
use integration_service::repo::event_log_repo::EventLogRepo;
use integration_service::repo::order_map_repo::{OrderMapRepo, OrderMapStore};
use integration_service::repo::queue_repo::QueueRepo;
use integration_service::service::dispatcher::EventDispatcher;
use integration_service::service::ingress::IngressService;
use integration_service::service::processor::Processor;
use integration_service::service::queue_monitor::QueueMonitor;
use integration_service::service::timeline::TimelineService;
use integration_service::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let metrics_handle = integration_service::metrics::install_recorder()?;

    let idempotency = IdempotencyStore::new(&cfg.redis_url)?;
    let event_log_repo = EventLogRepo { pool: pool.clone() };
    let order_map_repo = OrderMapRepo { pool: pool.clone() };
    let dlq_repo = DlqRepo { pool: pool.clone() };
    let queue_repo = QueueRepo { pool: pool.clone() };

    let backend: Arc<dyn integration_service::odoo::SalesBackend> = Arc::new(OdooJsonRpcClient::new(
        cfg.odoo_url.clone(),
        cfg.odoo_db.clone(),
        cfg.odoo_username.clone(),
        cfg.odoo_password.clone(),
    ));
    let order_map: Arc<dyn OrderMapStore> = Arc::new(order_map_repo.clone());

    let processor = Processor {
        queue_repo: queue_repo.clone(),
        event_log_repo: event_log_repo.clone(),
        dlq_repo,
        idempotency: idempotency.clone(),
        dispatcher: EventDispatcher { backend, order_map },
        backoff_base_ms: cfg.queue_backoff_base_ms,
        handler_timeout: std::time::Duration::from_millis(cfg.handler_timeout_ms),
    };
    for _ in 0..cfg.worker_concurrency {
        tokio::spawn(processor.clone().run());
    }

    let monitor = QueueMonitor {
        queue_repo: queue_repo.clone(),
        interval: std::time::Duration::from_secs(10),
    };
    tokio::spawn(monitor.run());

    let state = AppState {
        ingress: IngressService {
            idempotency,
            event_log_repo: event_log_repo.clone(),
            queue_repo,
            max_attempts: cfg.queue_max_attempts,
        },
        timeline: TimelineService {
            event_log_repo,
            order_map_repo,
        },
        webhook_secret: cfg.woo_webhook_secret.clone(),
        metrics_handle,
    };

    let internal_routes = Router::new()
        .route(
            "/internal/orders/:woo_order_id/timeline",
            get(integration_service::http::handlers::timeline::order_timeline),
        )
        .layer(from_fn_with_state(
            cfg.internal_api_key.clone(),
            integration_service::http::middleware::internal_auth::require_internal_api_key,
        ));

    let app = Router::new()
        .route("/health", get(integration_service::http::handlers::ops::health))
        .route("/metrics", get(integration_service::http::handlers::metrics::render))
        .route(
            "/webhook/woo",
            post(integration_service::http::handlers::webhook::woo_webhook),
        )
        .merge(internal_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
