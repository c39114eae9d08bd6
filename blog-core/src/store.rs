/// Document store abstraction
///
/// The blog service talks to persistence only through [`DocumentStore`].
/// Implementations own their concurrency control; in particular
/// `find_and_replace` must apply and return the update as one atomic step.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::object_id::ObjectId;
use crate::types::Document;

/// Result of a delete-by-id call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// One document was removed
    Deleted,
    /// No document had the given id
    NotFound,
}

/// A collection-oriented document store
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert a document and return its identifier.
    ///
    /// A document without `_id` is assigned a fresh one.
    async fn insert(&self, doc: Document) -> Result<ObjectId>;

    /// Find a document by identifier
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>>;

    /// Open a cursor over every document in the collection
    async fn find_all(&self) -> Result<Box<dyn Cursor>>;

    /// Overwrite the given fields of a document and return the updated document
    async fn find_and_replace(&self, id: &ObjectId, fields: Document) -> Result<Option<Document>>;

    /// Delete a document by identifier
    async fn delete_by_id(&self, id: &ObjectId) -> Result<DeleteOutcome>;
}

/// Server-held iterator over a query result
#[async_trait]
pub trait Cursor: Send {
    /// Next document, `Ok(None)` once exhausted
    async fn next(&mut self) -> Result<Option<Document>>;

    /// Release the cursor's resources
    fn close(&mut self);
}

/// Owns a cursor and closes it exactly once when dropped
pub struct CursorGuard {
    cursor: Option<Box<dyn Cursor>>,
}

impl CursorGuard {
    pub fn new(cursor: Box<dyn Cursor>) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }

    pub async fn next(&mut self) -> Result<Option<Document>> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.next().await,
            None => Err(crate::Error::CursorClosed),
        }
    }

    /// Close the cursor now instead of at drop
    pub fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
            debug!("Cursor released");
        }
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.close();
    }
}
