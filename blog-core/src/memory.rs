/// In-memory document store with optional JSON snapshot persistence
///
/// Documents live in an ordered map keyed by ObjectId behind an async RwLock.
/// Every mutation happens under the write lock, so `find_and_replace` is
/// atomic with respect to all other calls. When opened with a snapshot path,
/// the whole collection is rewritten (temp file + rename) after each
/// mutation, and the in-memory change is rolled back if the write fails.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::object_id::ObjectId;
use crate::store::{Cursor, DeleteOutcome, DocumentStore};
use crate::types::{document_id, Document, ID_FIELD};

type Collection = BTreeMap<ObjectId, Document>;

pub struct MemoryStore {
    docs: RwLock<Collection>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty, purely in-memory store
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Collection::new()),
            snapshot: None,
        }
    }

    /// Open a store backed by a JSON snapshot file
    ///
    /// A missing file yields an empty collection; the file is created on the
    /// first mutation.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let docs = match tokio::fs::read(&path).await {
            Ok(bytes) => load_snapshot(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Snapshot {:?} not found, starting with an empty collection", path);
                Collection::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!(documents = docs.len(), "Opened document store at {:?}", path);
        Ok(Self {
            docs: RwLock::new(docs),
            snapshot: Some(path),
        })
    }

    /// Snapshot path, if persistent
    pub fn path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    /// Number of documents in the collection
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    async fn persist(&self, docs: &Collection) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let all: Vec<&Document> = docs.values().collect();
        let bytes = serde_json::to_vec_pretty(&all)?;

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(documents = all.len(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn load_snapshot(bytes: &[u8]) -> Result<Collection> {
    let all: Vec<Document> = serde_json::from_slice(bytes)
        .map_err(|e| Error::Corruption(format!("unreadable snapshot: {}", e)))?;

    let mut docs = Collection::new();
    for (index, doc) in all.into_iter().enumerate() {
        let id = document_id(&doc).ok_or_else(|| {
            Error::Corruption(format!("document {} has no valid {}", index, ID_FIELD))
        })?;
        if docs.insert(id, doc).is_some() {
            return Err(Error::Corruption(format!("duplicate {} {}", ID_FIELD, id)));
        }
    }
    Ok(docs)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, mut doc: Document) -> Result<ObjectId> {
        let id = match doc.get(ID_FIELD) {
            None => {
                let id = ObjectId::new();
                doc.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
                id
            }
            Some(_) => document_id(&doc).ok_or_else(|| {
                Error::Internal(format!("{} must be a 24 digit hex string", ID_FIELD))
            })?,
        };

        let mut docs = self.docs.write().await;
        if docs.contains_key(&id) {
            return Err(Error::DuplicateKey(id));
        }
        docs.insert(id, doc);

        if let Err(e) = self.persist(&docs).await {
            docs.remove(&id);
            warn!(%id, "Insert rolled back: {}", e);
            return Err(e);
        }

        debug!(%id, "Document inserted");
        Ok(id)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>> {
        Ok(self.docs.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Box<dyn Cursor>> {
        let snapshot: Vec<Document> = self.docs.read().await.values().cloned().collect();
        debug!(documents = snapshot.len(), "Cursor opened");
        Ok(Box::new(MemoryCursor {
            docs: snapshot.into_iter(),
            closed: false,
        }))
    }

    async fn find_and_replace(&self, id: &ObjectId, fields: Document) -> Result<Option<Document>> {
        let mut docs = self.docs.write().await;
        let Some(doc) = docs.get_mut(id) else {
            return Ok(None);
        };

        let previous = doc.clone();
        for (key, value) in fields {
            if key == ID_FIELD {
                continue;
            }
            doc.insert(key, value);
        }
        let updated = doc.clone();

        if let Err(e) = self.persist(&docs).await {
            docs.insert(*id, previous);
            warn!(%id, "Update rolled back: {}", e);
            return Err(e);
        }

        debug!(%id, "Document replaced");
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, id: &ObjectId) -> Result<DeleteOutcome> {
        let mut docs = self.docs.write().await;
        let Some(removed) = docs.remove(id) else {
            return Ok(DeleteOutcome::NotFound);
        };

        if let Err(e) = self.persist(&docs).await {
            docs.insert(*id, removed);
            warn!(%id, "Delete rolled back: {}", e);
            return Err(e);
        }

        debug!(%id, "Document deleted");
        Ok(DeleteOutcome::Deleted)
    }
}

/// Cursor over a snapshot of the collection taken when it was opened
pub struct MemoryCursor {
    docs: std::vec::IntoIter<Document>,
    closed: bool,
}

#[async_trait]
impl Cursor for MemoryCursor {
    async fn next(&mut self) -> Result<Option<Document>> {
        if self.closed {
            return Err(Error::CursorClosed);
        }
        Ok(self.docs.next())
    }

    fn close(&mut self) {
        self.closed = true;
        // Drop the remaining snapshot eagerly
        self.docs = Vec::new().into_iter();
    }
}
