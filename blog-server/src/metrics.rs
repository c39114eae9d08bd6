/// Prometheus metrics for the blog server
///
/// This module defines and manages all metrics exposed by the server.
/// Metrics are collected by the RPC handlers and exposed at the /metrics
/// endpoint in Prometheus format.

use lazy_static::lazy_static;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter,
    register_int_counter_vec, register_int_gauge, Encoder, HistogramVec, IntCounter,
    IntCounterVec, IntGauge, Registry, TextEncoder,
};
use std::time::Instant;
use tonic::Status;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Total number of RPC requests by method and status
    ///
    /// Labels:
    /// - method: create_blog, read_blog, update_blog, delete_blog, list_blogs
    /// - status: success or error
    pub static ref RPC_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!(
            "blog_rpc_requests_total",
            "Total number of RPC requests"
        ),
        &["method", "status"]
    )
    .unwrap();

    /// RPC request duration in seconds (whole stream for list_blogs)
    pub static ref RPC_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        histogram_opts!(
            "blog_rpc_duration_seconds",
            "RPC request duration in seconds",
            vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
        ),
        &["method"]
    )
    .unwrap();

    /// Total number of document store operations by operation and status
    ///
    /// Labels:
    /// - operation: insert, find_by_id, find_all, find_and_replace, delete_by_id
    /// - status: success or error
    pub static ref STORE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!(
            "blog_store_operations_total",
            "Total number of document store operations"
        ),
        &["operation", "status"]
    )
    .unwrap();

    /// Total number of errors returned to clients, by gRPC code
    ///
    /// Labels:
    /// - error_type: invalid_argument, not_found, internal, unavailable
    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!(
            "blog_errors_total",
            "Total number of errors by type"
        ),
        &["error_type"]
    )
    .unwrap();

    /// Number of ListBlogs streams currently producing
    pub static ref ACTIVE_STREAMS: IntGauge = register_int_gauge!(
        opts!(
            "blog_active_streams",
            "Number of ListBlogs streams in progress"
        )
    )
    .unwrap();

    /// Total number of records sent on ListBlogs streams
    pub static ref STREAMED_RECORDS_TOTAL: IntCounter = register_int_counter!(
        opts!(
            "blog_streamed_records_total",
            "Total number of blog records streamed to clients"
        )
    )
    .unwrap();
}

/// Register all metrics with the global registry
pub fn register_metrics() {
    REGISTRY
        .register(Box::new(RPC_REQUESTS_TOTAL.clone()))
        .expect("Failed to register RPC_REQUESTS_TOTAL");

    REGISTRY
        .register(Box::new(RPC_DURATION_SECONDS.clone()))
        .expect("Failed to register RPC_DURATION_SECONDS");

    REGISTRY
        .register(Box::new(STORE_OPERATIONS_TOTAL.clone()))
        .expect("Failed to register STORE_OPERATIONS_TOTAL");

    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("Failed to register ERRORS_TOTAL");

    REGISTRY
        .register(Box::new(ACTIVE_STREAMS.clone()))
        .expect("Failed to register ACTIVE_STREAMS");

    REGISTRY
        .register(Box::new(STREAMED_RECORDS_TOTAL.clone()))
        .expect("Failed to register STREAMED_RECORDS_TOTAL");
}

/// Encode metrics in Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

fn status_label(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "error"
    }
}

/// Record the outcome and latency of one RPC
pub fn observe_rpc(method: &str, started: Instant, ok: bool) {
    RPC_REQUESTS_TOTAL
        .with_label_values(&[method, status_label(ok)])
        .inc();
    RPC_DURATION_SECONDS
        .with_label_values(&[method])
        .observe(started.elapsed().as_secs_f64());
}

/// Record the outcome of one document store call
pub fn observe_store(operation: &str, ok: bool) {
    STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, status_label(ok)])
        .inc();
}

/// Count an error status sent to a client
pub fn observe_error(status: &Status) {
    let error_type = match status.code() {
        tonic::Code::InvalidArgument => "invalid_argument",
        tonic::Code::NotFound => "not_found",
        tonic::Code::Internal => "internal",
        tonic::Code::Unavailable => "unavailable",
        _ => "other",
    };
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// RAII guard tracking one in-progress ListBlogs stream
///
/// Decrements [`ACTIVE_STREAMS`] when dropped, including when the producing
/// task is aborted.
pub struct StreamGauge(());

impl StreamGauge {
    pub fn start() -> Self {
        ACTIVE_STREAMS.inc();
        Self(())
    }
}

impl Drop for StreamGauge {
    fn drop(&mut self) {
        ACTIVE_STREAMS.dec();
    }
}
