/// Blogstone gRPC Server
///
/// This crate implements the BlogService gRPC API over a document store:
/// create, read, update and delete of single blog posts plus a server
/// streaming list of the whole collection.

pub mod config;
pub mod convert;
pub mod metrics;
pub mod service;
pub mod stream;

// Re-export key types
pub use blog_core::{DocumentStore, MemoryStore};
pub use blog_proto::blog_service_server::BlogServiceServer;
pub use config::ServiceConfig;
pub use service::BlogRecordService;
pub use stream::StreamEnd;
