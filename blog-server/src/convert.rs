/// Conversions between protobuf messages and blog records
///
/// Identifier translation happens only here: `encode_id` and `decode_id` are
/// the two pure functions between the wire string and the store-native
/// ObjectId. Past this boundary the service works on ObjectId exclusively.

use blog_core::{BlogRecord, Document, ObjectId, ObjectIdError};
use blog_proto as proto;
use thiserror::Error;

/// A stored document could not be turned into a wire message
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{0}")]
    Shape(#[from] serde_json::Error),

    #[error("document has no _id")]
    MissingId,
}

// ============================================================================
// Identifiers
// ============================================================================

/// Canonical wire form of a store identifier
pub fn encode_id(id: &ObjectId) -> String {
    id.to_hex()
}

/// Parse a wire identifier into the store-native type
pub fn decode_id(id: &str) -> Result<ObjectId, ObjectIdError> {
    ObjectId::parse_str(id)
}

// ============================================================================
// Records
// ============================================================================

/// Build a not-yet-inserted record from a request message; `blog.id` is ignored
pub fn proto_blog_to_record(blog: proto::Blog) -> BlogRecord {
    BlogRecord::new(blog.author_id, blog.title, blog.content)
}

/// Wire message for a record under the given identifier
pub fn record_to_proto_blog(id: &ObjectId, record: BlogRecord) -> proto::Blog {
    proto::Blog {
        id: encode_id(id),
        author_id: record.author_id,
        title: record.title,
        content: record.content,
    }
}

/// Decode a stored document, taking the identifier from the document itself
pub fn document_to_proto_blog(doc: Document) -> Result<proto::Blog, DecodeError> {
    let record = BlogRecord::from_document(doc)?;
    let id = record.id.ok_or(DecodeError::MissingId)?;
    Ok(record_to_proto_blog(&id, record))
}
