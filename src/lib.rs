pub mod config;
pub mod domain {
    pub mod envelope;
    pub mod sanitize;
}
pub mod http {
    pub mod handlers {
        pub mod metrics;
        pub mod ops;
        pub mod timeline;
        pub mod webhook;
    }
    pub mod middleware {
        pub mod internal_auth;
    }
}
pub mod idempotency;
pub mod metrics;
pub mod odoo;
pub mod repo {
    pub mod dlq_repo;
    pub mod event_log_repo;
    pub mod order_map_repo;
    pub mod queue_repo;
}
pub mod service {
    pub mod dispatcher;
    pub mod ingress;
    pub mod processor;
    pub mod queue_monitor;
    pub mod timeline;
}

#[derive(Clone)]
pub struct AppState {
    pub ingress: service::ingress::IngressService,
    pub timeline: service::timeline::TimelineService,
    pub webhook_secret: String,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
