/// Blogstone gRPC Client Library
///
/// This crate provides a Rust client for connecting to Blogstone gRPC servers.

pub mod client;
pub mod error;
pub mod table;

// Re-export key types
pub use client::{BlogClient, BlogPost, BlogStream};
pub use error::{ClientError, Result};
