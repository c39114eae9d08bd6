/// End-to-end tests over a real gRPC connection
///
/// These start an in-process server on an ephemeral port and drive it with
/// the client library.

use blog_client::{BlogPost, ClientError};
use blog_core::{DocumentStore, MemoryStore, ObjectId};
use blog_server::ServiceConfig;
use blog_test_utils::{blog_document, malformed_document, CursorStep, MockStore, TestServer};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_crud_over_the_wire() {
    let server = TestServer::start(Arc::new(MemoryStore::new())).await.unwrap();
    let mut client = server.client().await.unwrap();

    let created = client.create_blog("alice", "Hello", "First post").await.unwrap();
    assert_eq!(created.id.len(), 24);

    let fetched = client.read_blog(&created.id).await.unwrap();
    assert_eq!(fetched, created);

    let updated = client
        .update_blog(&BlogPost {
            id: created.id.clone(),
            author_id: "Z".to_string(),
            title: "New".to_string(),
            content: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(updated.title, "New");
    assert_eq!(updated.content, "");

    assert!(client.delete_blog(&created.id).await.unwrap());
    assert!(matches!(
        client.delete_blog(&created.id).await,
        Err(ClientError::NotFound(_))
    ));
    assert!(matches!(
        client.read_blog(&created.id).await,
        Err(ClientError::NotFound(_))
    ));

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_id_over_the_wire() {
    let server = TestServer::start(Arc::new(MemoryStore::new())).await.unwrap();
    let mut client = server.client().await.unwrap();

    assert!(matches!(
        client.read_blog("1234").await,
        Err(ClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.delete_blog("zzzzzzzzzzzzzzzzzzzzzzzz").await,
        Err(ClientError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_update_missing_record_over_the_wire() {
    let server = TestServer::start(Arc::new(MemoryStore::new())).await.unwrap();
    let mut client = server.client().await.unwrap();

    let missing = BlogPost {
        id: ObjectId::new().to_hex(),
        author_id: "a".to_string(),
        title: "t".to_string(),
        content: "c".to_string(),
    };
    assert!(matches!(
        client.update_blog(&missing).await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_streams_every_record() {
    let server = TestServer::start_with_config(
        Arc::new(MemoryStore::new()),
        ServiceConfig::default().with_stream_buffer(2),
    )
    .await
    .unwrap();
    let mut client = server.client().await.unwrap();

    assert!(client.list_blogs().await.unwrap().is_empty());

    for i in 0..10 {
        client
            .create_blog(format!("author-{}", i), format!("title-{}", i), "")
            .await
            .unwrap();
    }

    let posts = client.list_blogs().await.unwrap();
    assert_eq!(posts.len(), 10);
    let mut titles: Vec<String> = posts.into_iter().map(|p| p.title).collect();
    titles.sort();
    let mut expected: Vec<String> = (0..10).map(|i| format!("title-{}", i)).collect();
    expected.sort();
    assert_eq!(titles, expected);
}

#[tokio::test]
async fn test_list_decode_failure_over_the_wire() {
    let store = Arc::new(MockStore::new());
    store.script_cursor(vec![
        CursorStep::Doc(blog_document("a", "first", "")),
        CursorStep::Doc(malformed_document()),
        CursorStep::Doc(blog_document("c", "third", "")),
    ]);
    let server = TestServer::start(Arc::clone(&store) as Arc<dyn DocumentStore>)
        .await
        .unwrap();
    let mut client = server.client().await.unwrap();

    let mut stream = client.list_blogs_stream().await.unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.title, "first");
    assert!(matches!(stream.next().await, Err(ClientError::Unavailable(_))));

    assert_eq!(store.wait_for_closes(1).await, 1);
}

#[tokio::test]
async fn test_client_disconnect_releases_cursor() {
    let store = Arc::new(MockStore::new());
    let server = TestServer::start_with_config(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        ServiceConfig::default().with_stream_buffer(1),
    )
    .await
    .unwrap();
    let mut client = server.client().await.unwrap();

    for i in 0..200 {
        client
            .create_blog("a", format!("post {}", i), "x".repeat(1024))
            .await
            .unwrap();
    }

    let mut stream = client.list_blogs_stream().await.unwrap();
    assert!(stream.next().await.unwrap().is_some());
    drop(stream);
    drop(client);

    assert_eq!(store.wait_for_closes(1).await, 1);
    server.stop().await;
}

#[tokio::test]
async fn test_records_survive_server_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blogs.json");

    let id = {
        let store = MemoryStore::open(&path).await.unwrap();
        let server = TestServer::start(Arc::new(store)).await.unwrap();
        let mut client = server.client().await.unwrap();
        let created = client.create_blog("alice", "Persisted", "body").await.unwrap();
        server.stop().await;
        created.id
    };

    let store = MemoryStore::open(&path).await.unwrap();
    let server = TestServer::start(Arc::new(store)).await.unwrap();
    let mut client = server.client().await.unwrap();

    let fetched = client.read_blog(&id).await.unwrap();
    assert_eq!(fetched.title, "Persisted");
    assert_eq!(fetched.author_id, "alice");
}
