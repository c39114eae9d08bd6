/// Blogstone gRPC Server Binary
///
/// Starts a gRPC server that exposes blog records over the network.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use blog_core::{DocumentStore, MemoryStore};
use blog_server::{metrics, BlogRecordService, BlogServiceServer, ServiceConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "blog-server")]
#[command(about = "Blogstone gRPC Server", long_about = None)]
struct Args {
    /// JSON snapshot file backing the blog collection (in-memory when omitted)
    #[arg(short, long, value_name = "PATH")]
    data_file: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value = "4040")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port for the HTTP metrics and health endpoints (0 = disabled)
    #[arg(long, default_value = "9090")]
    metrics_port: u16,

    /// Request timeout in seconds
    #[arg(long, default_value = "60")]
    connection_timeout: u64,

    /// Number of ListBlogs responses buffered per stream
    #[arg(long, default_value = "32")]
    stream_buffer: usize,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

async fn metrics_handler() -> String {
    metrics::encode_metrics().unwrap_or_else(|e| {
        tracing::error!("Failed to encode metrics: {}", e);
        String::from("# Error encoding metrics\n")
    })
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn ready_handler() -> &'static str {
    "OK"
}

fn init_tracing(json: bool) {
    // Default to info level, can override with RUST_LOG env var
    // Example: RUST_LOG=blog_server=debug cargo run --bin blog-server
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, keep serving until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Stopping the server...");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    metrics::register_metrics();
    info!("Initialized Prometheus metrics");

    let store: Arc<dyn DocumentStore> = match &args.data_file {
        Some(path) => {
            info!("Opening blog collection at {:?}", path);
            Arc::new(
                MemoryStore::open(path)
                    .await
                    .with_context(|| format!("Failed to open data file {:?}", path))?,
            )
        }
        None => {
            info!("No data file given, blog collection is in-memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let config = ServiceConfig::default().with_stream_buffer(args.stream_buffer);
    let service = BlogRecordService::with_config(store, config);
    let grpc_addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("Invalid listen address")?;

    if args.metrics_port != 0 {
        let metrics_app = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler));
        let metrics_addr = format!("{}:{}", args.host, args.metrics_port);

        info!("Starting HTTP server on {} with /metrics, /health, /ready endpoints", metrics_addr);

        let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
            .await
            .with_context(|| format!("Failed to bind metrics endpoint {}", metrics_addr))?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, metrics_app).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    }

    let server = Server::builder()
        .timeout(Duration::from_secs(args.connection_timeout))
        .tcp_keepalive(Some(Duration::from_secs(30)))
        .tcp_nodelay(true)
        .add_service(BlogServiceServer::new(service));

    info!(
        "Starting blog gRPC server on {} (timeout={}s, stream_buffer={})",
        grpc_addr, args.connection_timeout, args.stream_buffer
    );

    server.serve_with_shutdown(grpc_addr, shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}
