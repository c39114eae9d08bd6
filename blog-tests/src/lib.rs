/// Test utilities and helpers for Blogstone testing
///
/// This module provides a store double that records calls and can inject
/// failures or scripted cursors, and an in-process gRPC server bound to an
/// ephemeral port.

use async_trait::async_trait;
use blog_client::BlogClient;
use blog_core::{
    BlogRecord, Cursor, DeleteOutcome, Document, DocumentStore, Error, MemoryStore, ObjectId,
    Result,
};
use blog_server::{BlogRecordService, BlogServiceServer, ServiceConfig};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

/// One step of a scripted cursor
#[derive(Debug, Clone)]
pub enum CursorStep {
    /// Yield this document
    Doc(Document),
    /// Fail with a cursor-level error
    Fail(String),
}

/// Document store double
///
/// Delegates to a [`MemoryStore`] unless told to fail, counts every call, and
/// counts how many cursors were closed.
pub struct MockStore {
    inner: MemoryStore,
    calls: AtomicUsize,
    failing: AtomicBool,
    script: Mutex<Option<Vec<CursorStep>>>,
    closes: Arc<AtomicUsize>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            script: Mutex::new(None),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of store calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail (or stop failing)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Serve `find_all` from these steps instead of the collection
    pub fn script_cursor(&self, steps: Vec<CursorStep>) {
        *self.script.lock().expect("script lock poisoned") = Some(steps);
    }

    /// Number of cursors released so far
    pub fn cursor_closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` cursors were released, or give up after a second
    pub async fn wait_for_closes(&self, n: usize) -> usize {
        for _ in 0..100 {
            if self.cursor_closes() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.cursor_closes()
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Internal("injected store failure".to_string()));
        }
        Ok(())
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn insert(&self, doc: Document) -> Result<ObjectId> {
        self.enter()?;
        self.inner.insert(doc).await
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>> {
        self.enter()?;
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Box<dyn Cursor>> {
        self.enter()?;
        let script = self.script.lock().expect("script lock poisoned").clone();
        let inner: Box<dyn Cursor> = match script {
            Some(steps) => Box::new(ScriptedCursor {
                steps: steps.into_iter(),
            }),
            None => self.inner.find_all().await?,
        };
        Ok(Box::new(CountingCursor {
            inner,
            closes: Arc::clone(&self.closes),
        }))
    }

    async fn find_and_replace(&self, id: &ObjectId, fields: Document) -> Result<Option<Document>> {
        self.enter()?;
        self.inner.find_and_replace(id, fields).await
    }

    async fn delete_by_id(&self, id: &ObjectId) -> Result<DeleteOutcome> {
        self.enter()?;
        self.inner.delete_by_id(id).await
    }
}

struct ScriptedCursor {
    steps: std::vec::IntoIter<CursorStep>,
}

#[async_trait]
impl Cursor for ScriptedCursor {
    async fn next(&mut self) -> Result<Option<Document>> {
        match self.steps.next() {
            Some(CursorStep::Doc(doc)) => Ok(Some(doc)),
            Some(CursorStep::Fail(msg)) => Err(Error::Internal(msg)),
            None => Ok(None),
        }
    }

    fn close(&mut self) {}
}

struct CountingCursor {
    inner: Box<dyn Cursor>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Cursor for CountingCursor {
    async fn next(&mut self) -> Result<Option<Document>> {
        self.inner.next().await
    }

    fn close(&mut self) {
        self.inner.close();
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A stored-shape document for a record with a fresh id
pub fn blog_document(author_id: &str, title: &str, content: &str) -> Document {
    let mut record = BlogRecord::new(author_id, title, content);
    record.id = Some(ObjectId::new());
    record.to_document()
}

/// A document with a valid id that does not decode into a blog record
pub fn malformed_document() -> Document {
    let mut doc = Document::new();
    doc.insert("_id".to_string(), serde_json::Value::String(ObjectId::new().to_hex()));
    doc.insert("author_id".to_string(), serde_json::Value::from(42));
    doc
}

/// In-process gRPC server on an ephemeral localhost port
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server over the given store
    pub async fn start(store: Arc<dyn DocumentStore>) -> anyhow::Result<Self> {
        Self::start_with_config(store, ServiceConfig::default()).await
    }

    pub async fn start_with_config(
        store: Arc<dyn DocumentStore>,
        config: ServiceConfig,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let incoming = TcpListenerStream::new(listener);

        let service = BlogRecordService::with_config(store, config);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let result = Server::builder()
                .add_service(BlogServiceServer::new(service))
                .serve_with_incoming_shutdown(incoming, async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                eprintln!("test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Server URL for clients
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Connect a new client to this server
    pub async fn client(&self) -> anyhow::Result<BlogClient> {
        Ok(BlogClient::connect(self.url()).await?)
    }

    /// Stop the server and wait for it to finish
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
