//! Host shell endpoints
//!
//! HTTP handlers for:
//! - Pages (view models of the dependent views)
//! - Metrics (Prometheus)

pub mod metrics;
mod pages;

pub use metrics::metrics_router;
pub use pages::pages_router;
