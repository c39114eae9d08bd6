/// gRPC service implementation for blog records
///
/// This module implements the BlogService gRPC trait, wiring the protocol
/// buffer interface to a [`DocumentStore`]. Every store failure is turned
/// into exactly one gRPC status at the call site.

use blog_core::{CursorGuard, DeleteOutcome, DocumentStore, ObjectId, ObjectIdError};
use blog_proto::{self as proto, blog_service_server::BlogService};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{debug, warn, Instrument};

use crate::config::ServiceConfig;
use crate::convert::*;
use crate::metrics;
use crate::stream::stream_blogs;

/// Blog record gRPC service
///
/// Holds no mutable state of its own; all state lives in the injected store.
#[derive(Clone)]
pub struct BlogRecordService {
    store: Arc<dyn DocumentStore>,
    config: ServiceConfig,
}

impl BlogRecordService {
    /// Create a service over the given store with default settings
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: Arc<dyn DocumentStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    async fn create(&self, req: proto::CreateBlogReq) -> Result<proto::CreateBlogRes, Status> {
        let blog = req
            .blog
            .ok_or_else(|| Status::invalid_argument("Blog required"))?;
        let record = proto_blog_to_record(blog);

        let inserted = self.store.insert(record.to_document()).await;
        metrics::observe_store("insert", inserted.is_ok());
        let id = inserted.map_err(|e| Status::internal(format!("Internal server error: {}", e)))?;

        debug!(%id, author_id = %record.author_id, "Blog created");
        Ok(proto::CreateBlogRes {
            blog: Some(record_to_proto_blog(&id, record)),
        })
    }

    async fn read(&self, req: proto::ReadBlogReq) -> Result<proto::ReadBlogRes, Status> {
        let id = request_id(&req.id)?;

        let found = self.store.find_by_id(&id).await;
        metrics::observe_store("find_by_id", found.is_ok());

        let record = match found {
            Ok(Some(doc)) => blog_core::BlogRecord::from_document(doc)
                .map_err(|e| not_found_with_cause(&req.id, e))?,
            Ok(None) => return Err(not_found(&req.id)),
            Err(e) => return Err(not_found_with_cause(&req.id, e)),
        };

        // Echo the identifier used for the lookup in canonical form
        Ok(proto::ReadBlogRes {
            blog: Some(record_to_proto_blog(&id, record)),
        })
    }

    async fn update(&self, req: proto::UpdateBlogReq) -> Result<proto::UpdateBlogRes, Status> {
        let blog = req
            .blog
            .ok_or_else(|| Status::invalid_argument("Blog required"))?;
        let id = request_id(&blog.id)?;
        let raw_id = blog.id.clone();
        let fields = proto_blog_to_record(blog).content_fields();

        let replaced = self.store.find_and_replace(&id, fields).await;
        metrics::observe_store("find_and_replace", replaced.is_ok());

        let updated = match replaced {
            Ok(Some(doc)) => {
                document_to_proto_blog(doc).map_err(|e| not_found_with_cause(&raw_id, e))?
            }
            Ok(None) => return Err(not_found(&raw_id)),
            Err(e) => return Err(not_found_with_cause(&raw_id, e)),
        };

        debug!(%id, "Blog updated");
        Ok(proto::UpdateBlogRes {
            blog: Some(updated),
        })
    }

    async fn delete(&self, req: proto::DeleteBlogReq) -> Result<proto::DeleteBlogRes, Status> {
        let id = request_id(&req.id)?;

        let deleted = self.store.delete_by_id(&id).await;
        metrics::observe_store("delete_by_id", deleted.is_ok());

        match deleted {
            Ok(DeleteOutcome::Deleted) => {
                debug!(%id, "Blog deleted");
                Ok(proto::DeleteBlogRes { success: true })
            }
            Ok(DeleteOutcome::NotFound) => Err(not_found(&req.id)),
            Err(e) => Err(Status::not_found(format!(
                "Could not find/delete blog with id {}: {}",
                req.id, e
            ))),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Decode a client-supplied identifier, rejecting it before any store access
fn request_id(raw: &str) -> Result<ObjectId, Status> {
    decode_id(raw).map_err(|e: ObjectIdError| {
        Status::invalid_argument(format!(
            "Invalid input by user, can't convert ObjectId {:?}: {}",
            raw, e
        ))
    })
}

fn not_found(raw_id: &str) -> Status {
    Status::not_found(format!("Could not find blog with ObjectId {}", raw_id))
}

fn not_found_with_cause(raw_id: &str, cause: impl std::fmt::Display) -> Status {
    Status::not_found(format!(
        "Could not find blog with ObjectId {}: {}",
        raw_id, cause
    ))
}

/// Record metrics and log the status of a finished unary call
fn finish<T>(
    method: &'static str,
    started: Instant,
    result: Result<T, Status>,
) -> Result<Response<T>, Status> {
    metrics::observe_rpc(method, started, result.is_ok());
    if let Err(status) = &result {
        metrics::observe_error(status);
        warn!(method, code = ?status.code(), "{}", status.message());
    }
    result.map(Response::new)
}

// ============================================================================
// gRPC Service Implementation
// ============================================================================

#[tonic::async_trait]
impl BlogService for BlogRecordService {
    /// Insert a new blog post
    async fn create_blog(
        &self,
        request: Request<proto::CreateBlogReq>,
    ) -> Result<Response<proto::CreateBlogRes>, Status> {
        let started = Instant::now();
        finish("create_blog", started, self.create(request.into_inner()).await)
    }

    /// Fetch one blog post by id
    async fn read_blog(
        &self,
        request: Request<proto::ReadBlogReq>,
    ) -> Result<Response<proto::ReadBlogRes>, Status> {
        let started = Instant::now();
        finish("read_blog", started, self.read(request.into_inner()).await)
    }

    /// Replace author, title and content of a blog post
    async fn update_blog(
        &self,
        request: Request<proto::UpdateBlogReq>,
    ) -> Result<Response<proto::UpdateBlogRes>, Status> {
        let started = Instant::now();
        finish("update_blog", started, self.update(request.into_inner()).await)
    }

    /// Delete a blog post by id
    async fn delete_blog(
        &self,
        request: Request<proto::DeleteBlogReq>,
    ) -> Result<Response<proto::DeleteBlogRes>, Status> {
        let started = Instant::now();
        finish("delete_blog", started, self.delete(request.into_inner()).await)
    }

    /// Stream every blog post (server streaming)
    type ListBlogsStream = ReceiverStream<Result<proto::ListBlogsRes, Status>>;

    async fn list_blogs(
        &self,
        _request: Request<proto::ListBlogsReq>,
    ) -> Result<Response<Self::ListBlogsStream>, Status> {
        let started = Instant::now();

        let opened = self.store.find_all().await;
        metrics::observe_store("find_all", opened.is_ok());
        let cursor = match opened {
            Ok(cursor) => CursorGuard::new(cursor),
            Err(e) => {
                let status = Status::internal(format!("Unknown internal error: {}", e));
                return finish("list_blogs", started, Err(status));
            }
        };

        let (tx, rx) = mpsc::channel(self.config.channel_capacity());
        let span = tracing::info_span!("list_blogs");
        tokio::spawn(stream_blogs(cursor, tx, started).instrument(span));

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
