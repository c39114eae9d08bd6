/// Blogstone core
///
/// Blog record model, store-native identifiers and the document store
/// abstraction the gRPC service is written against.

pub mod error;
pub mod memory;
pub mod object_id;
pub mod store;
pub mod types;

pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use object_id::{ObjectId, ObjectIdError};
pub use store::{Cursor, CursorGuard, DeleteOutcome, DocumentStore};
pub use types::{BlogRecord, Document};
