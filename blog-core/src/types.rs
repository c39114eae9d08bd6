use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::object_id::ObjectId;

/// A stored document: a JSON object keyed by field name
pub type Document = Map<String, Value>;

/// Field holding a document's identifier
pub const ID_FIELD: &str = "_id";

pub const AUTHOR_ID_FIELD: &str = "author_id";
pub const TITLE_FIELD: &str = "title";
pub const CONTENT_FIELD: &str = "content";

/// A persisted blog post
///
/// `id` is unset until the store assigns one on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub author_id: String,
    pub title: String,
    pub content: String,
}

impl BlogRecord {
    /// Create a record that has not been inserted yet
    pub fn new(
        author_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            author_id: author_id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Decode a record from a stored document
    pub fn from_document(doc: Document) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(doc))
    }

    /// Encode this record as a document
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(id) = self.id {
            doc.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
        }
        doc.extend(self.content_fields());
        doc
    }

    /// The three mutable fields, used as a full replacement on update
    pub fn content_fields(&self) -> Document {
        let mut fields = Document::new();
        fields.insert(AUTHOR_ID_FIELD.to_string(), Value::String(self.author_id.clone()));
        fields.insert(TITLE_FIELD.to_string(), Value::String(self.title.clone()));
        fields.insert(CONTENT_FIELD.to_string(), Value::String(self.content.clone()));
        fields
    }
}

/// Read the identifier stored in a document, if any
pub fn document_id(doc: &Document) -> Option<ObjectId> {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| ObjectId::parse_str(s).ok())
}
