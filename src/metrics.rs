//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Session Metrics
    pub static ref SESSION_TRANSITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("relayforge_web_session_transitions_total", "Total number of session store transitions"),
        &["transition"]
    ).expect("metric can be created");
    pub static ref SESSION_AUTHENTICATED: IntGauge = IntGauge::new(
        "relayforge_web_session_authenticated",
        "1 when the session store holds an authenticated session"
    ).expect("metric can be created");

    // Handoff Metrics
    pub static ref HANDOFF_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("relayforge_web_handoff_total", "Total number of login handoff events"),
        &["phase", "outcome"]
    ).expect("metric can be created");

    // Backend Metrics
    pub static ref BACKEND_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("relayforge_web_backend_requests_total", "Total number of requests sent to the orchestration API"),
        &["endpoint", "status"]
    ).expect("metric can be created");
    pub static ref BACKEND_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "relayforge_web_backend_request_duration_seconds",
            "Orchestration API request duration in seconds"
        ).buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("relayforge_web_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(SESSION_TRANSITIONS_TOTAL.clone()))
            .expect("SESSION_TRANSITIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(SESSION_AUTHENTICATED.clone()))
            .expect("SESSION_AUTHENTICATED can be registered");
        REGISTRY
            .register(Box::new(HANDOFF_TOTAL.clone()))
            .expect("HANDOFF_TOTAL can be registered");
        REGISTRY
            .register(Box::new(BACKEND_REQUESTS_TOTAL.clone()))
            .expect("BACKEND_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(BACKEND_REQUEST_DURATION_SECONDS.clone()))
            .expect("BACKEND_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}
