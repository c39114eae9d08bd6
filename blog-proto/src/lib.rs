//! Generated protobuf types and gRPC service traits for the blog API
//!
//! Exposes `blog_service_server::{BlogService, BlogServiceServer}` for the
//! server and `blog_service_client::BlogServiceClient` for clients.

tonic::include_proto!("blog");
