/// Handler-level tests for the blog service
///
/// These call the gRPC trait methods directly (no network) against the
/// recording store double, so store access can be observed.

use blog_core::{DocumentStore, ObjectId};
use blog_proto::{
    blog_service_server::BlogService, Blog, CreateBlogReq, DeleteBlogReq, ListBlogsReq,
    ReadBlogReq, UpdateBlogReq,
};
use blog_server::{BlogRecordService, ServiceConfig};
use blog_test_utils::{blog_document, malformed_document, CursorStep, MockStore};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tonic::{Code, Request, Status};

fn setup() -> (Arc<MockStore>, BlogRecordService) {
    let store = Arc::new(MockStore::new());
    let service = BlogRecordService::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
    (store, service)
}

fn blog(id: &str, author_id: &str, title: &str, content: &str) -> Blog {
    Blog {
        id: id.to_string(),
        author_id: author_id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
    }
}

async fn create(service: &BlogRecordService, author_id: &str, title: &str, content: &str) -> Blog {
    service
        .create_blog(Request::new(CreateBlogReq {
            blog: Some(blog("", author_id, title, content)),
        }))
        .await
        .unwrap()
        .into_inner()
        .blog
        .unwrap()
}

async fn read(service: &BlogRecordService, id: &str) -> Result<Blog, Status> {
    service
        .read_blog(Request::new(ReadBlogReq { id: id.to_string() }))
        .await
        .map(|r| r.into_inner().blog.unwrap())
}

async fn update(service: &BlogRecordService, b: Blog) -> Result<Blog, Status> {
    service
        .update_blog(Request::new(UpdateBlogReq { blog: Some(b) }))
        .await
        .map(|r| r.into_inner().blog.unwrap())
}

async fn delete(service: &BlogRecordService, id: &str) -> Result<bool, Status> {
    service
        .delete_blog(Request::new(DeleteBlogReq { id: id.to_string() }))
        .await
        .map(|r| r.into_inner().success)
}

/// Drain a ListBlogs stream into (records, terminating error)
async fn list(service: &BlogRecordService) -> (Vec<Blog>, Option<Status>) {
    let mut stream = service
        .list_blogs(Request::new(ListBlogsReq {}))
        .await
        .unwrap()
        .into_inner();

    // Drain to the end so the producer has finished when this returns
    let mut blogs = Vec::new();
    let mut error = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(res) => blogs.push(res.blog.unwrap()),
            Err(status) => error = Some(status),
        }
    }
    (blogs, error)
}

// ============================================================================
// Create / Read
// ============================================================================

#[tokio::test]
async fn test_create_then_read_round_trip() {
    let (_store, service) = setup();

    let created = create(&service, "alice", "Hello", "First post").await;
    assert_eq!(created.id.len(), 24);
    assert_eq!(created.author_id, "alice");

    let fetched = read(&service, &created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_create_accepts_empty_fields() {
    let (_store, service) = setup();
    let created = create(&service, "", "", "").await;
    let fetched = read(&service, &created.id).await.unwrap();
    assert_eq!(fetched.title, "");
    assert_eq!(fetched.content, "");
}

#[tokio::test]
async fn test_create_ignores_client_id() {
    let (_store, service) = setup();
    let supplied = ObjectId::new().to_hex();

    let created = service
        .create_blog(Request::new(CreateBlogReq {
            blog: Some(blog(&supplied, "a", "t", "c")),
        }))
        .await
        .unwrap()
        .into_inner()
        .blog
        .unwrap();
    assert_ne!(created.id, supplied);
}

#[tokio::test]
async fn test_create_without_blog_is_invalid() {
    let (store, service) = setup();
    let status = service
        .create_blog(Request::new(CreateBlogReq { blog: None }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_create_store_failure_is_internal() {
    let (store, service) = setup();
    store.set_failing(true);

    let status = service
        .create_blog(Request::new(CreateBlogReq {
            blog: Some(blog("", "a", "t", "c")),
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert!(status.message().contains("injected store failure"));
}

#[tokio::test]
async fn test_read_echoes_canonical_id() {
    let (_store, service) = setup();
    let created = create(&service, "a", "t", "c").await;

    let fetched = read(&service, &created.id.to_uppercase()).await.unwrap();
    assert_eq!(fetched.id, created.id);
}

#[tokio::test]
async fn test_read_store_failure_is_not_found() {
    let (store, service) = setup();
    let created = create(&service, "a", "t", "c").await;
    store.set_failing(true);

    let status = read(&service, &created.id).await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_read_undecodable_record_is_not_found() {
    let (store, service) = setup();
    let doc = malformed_document();
    let id = store.insert(doc).await.unwrap();

    let status = read(&service, &id.to_hex()).await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

// ============================================================================
// Identifier validation and absence
// ============================================================================

#[tokio::test]
async fn test_malformed_ids_never_reach_the_store() {
    let (store, service) = setup();
    let malformed = [
        "",
        "abc",
        "650abcde0102030405ff001",
        "650abcde0102030405ff00100",
        "650abcde0102030405ff00zz",
        "not an object id at all!",
    ];

    for raw in malformed {
        let status = read(&service, raw).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument, "read {:?}", raw);

        let status = update(&service, blog(raw, "a", "t", "c")).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument, "update {:?}", raw);

        let status = delete(&service, raw).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument, "delete {:?}", raw);
    }

    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let (_store, service) = setup();
    let id = ObjectId::new().to_hex();

    assert_eq!(read(&service, &id).await.unwrap_err().code(), Code::NotFound);
    assert_eq!(
        update(&service, blog(&id, "a", "t", "c")).await.unwrap_err().code(),
        Code::NotFound
    );
    assert_eq!(delete(&service, &id).await.unwrap_err().code(), Code::NotFound);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_replaces_all_fields() {
    let (_store, service) = setup();
    let created = create(&service, "alice", "Old", "Body").await;

    let updated = update(&service, blog(&created.id, "Z", "New", "")).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.author_id, "Z");
    assert_eq!(updated.title, "New");
    assert_eq!(updated.content, "");

    let fetched = read(&service, &created.id).await.unwrap();
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn test_update_without_blog_is_invalid() {
    let (store, service) = setup();
    let status = service
        .update_blog(Request::new(UpdateBlogReq { blog: None }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_update_store_failure_is_not_found() {
    let (store, service) = setup();
    let created = create(&service, "a", "t", "c").await;
    store.set_failing(true);

    let status = update(&service, blog(&created.id, "b", "u", "d")).await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_concurrent_updates_never_interleave() {
    let (_store, service) = setup();
    let service = Arc::new(service);
    let created = create(&service, "init", "init", "init").await;

    let mut handles = Vec::new();
    for i in 0..24 {
        let service = Arc::clone(&service);
        let id = created.id.clone();
        handles.push(tokio::spawn(async move {
            let tag = format!("writer-{}", i);
            update(&service, blog(&id, &tag, &tag, &tag)).await.unwrap()
        }));
    }
    for handle in handles {
        let returned = handle.await.unwrap();
        assert_eq!(returned.author_id, returned.title);
        assert_eq!(returned.title, returned.content);
    }

    let final_state = read(&service, &created.id).await.unwrap();
    assert_eq!(final_state.author_id, final_state.title);
    assert_eq!(final_state.title, final_state.content);
    assert!(final_state.title.starts_with("writer-"));
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_twice_is_not_found() {
    let (_store, service) = setup();
    let created = create(&service, "a", "t", "c").await;

    assert!(delete(&service, &created.id).await.unwrap());
    assert_eq!(
        delete(&service, &created.id).await.unwrap_err().code(),
        Code::NotFound
    );
    assert_eq!(read(&service, &created.id).await.unwrap_err().code(), Code::NotFound);
}

#[tokio::test]
async fn test_delete_store_failure_is_not_found() {
    let (store, service) = setup();
    let created = create(&service, "a", "t", "c").await;
    store.set_failing(true);

    let status = delete(&service, &created.id).await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
    assert!(status.message().contains("injected store failure"));
}

// ============================================================================
// List
// ============================================================================

#[tokio::test]
async fn test_list_empty_collection() {
    let (store, service) = setup();
    let (blogs, error) = list(&service).await;
    assert!(blogs.is_empty());
    assert!(error.is_none());
    assert_eq!(store.wait_for_closes(1).await, 1);
}

#[tokio::test]
async fn test_list_two_records() {
    let (store, service) = setup();
    create(&service, "A", "T1", "C1").await;
    create(&service, "B", "T2", "C2").await;

    let (blogs, error) = list(&service).await;
    assert!(error.is_none());
    assert_eq!(blogs.len(), 2);

    let ids: HashSet<&str> = blogs.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|id| !id.is_empty()));

    let mut fields: Vec<(&str, &str, &str)> = blogs
        .iter()
        .map(|b| (b.author_id.as_str(), b.title.as_str(), b.content.as_str()))
        .collect();
    fields.sort();
    assert_eq!(fields, vec![("A", "T1", "C1"), ("B", "T2", "C2")]);

    assert_eq!(store.wait_for_closes(1).await, 1);
}

#[tokio::test]
async fn test_list_decode_failure_aborts_and_releases_cursor() {
    let (store, service) = setup();
    store.script_cursor(vec![
        CursorStep::Doc(blog_document("a", "first", "")),
        CursorStep::Doc(malformed_document()),
        CursorStep::Doc(blog_document("c", "third", "")),
    ]);

    let (blogs, error) = list(&service).await;
    assert_eq!(blogs.len(), 1);
    assert_eq!(blogs[0].title, "first");
    assert_eq!(error.unwrap().code(), Code::Unavailable);

    // Released before the producer drops its sender, so exactly once by now
    assert_eq!(store.cursor_closes(), 1);
    tokio::task::yield_now().await;
    assert_eq!(store.cursor_closes(), 1);
}

#[tokio::test]
async fn test_list_cursor_error_is_internal() {
    let (store, service) = setup();
    store.script_cursor(vec![
        CursorStep::Doc(blog_document("a", "first", "")),
        CursorStep::Fail("connection reset".into()),
    ]);

    let (blogs, error) = list(&service).await;
    assert_eq!(blogs.len(), 1);
    let status = error.unwrap();
    assert_eq!(status.code(), Code::Internal);
    assert!(status.message().contains("connection reset"));
    assert_eq!(store.cursor_closes(), 1);
}

#[tokio::test]
async fn test_list_open_failure_is_internal() {
    let (store, service) = setup();
    store.set_failing(true);

    let status = service
        .list_blogs(Request::new(ListBlogsReq {}))
        .await
        .err()
        .expect("opening the cursor should fail");
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(store.cursor_closes(), 0);
}

#[tokio::test]
async fn test_list_cancellation_releases_cursor() {
    let store = Arc::new(MockStore::new());
    let service = BlogRecordService::with_config(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        ServiceConfig::default().with_stream_buffer(1),
    );
    for i in 0..50 {
        create(&service, "a", &format!("post {}", i), "").await;
    }

    let mut stream = service
        .list_blogs(Request::new(ListBlogsReq {}))
        .await
        .unwrap()
        .into_inner();
    assert!(stream.next().await.unwrap().is_ok());
    drop(stream);

    assert_eq!(store.wait_for_closes(1).await, 1);
}

#[tokio::test]
async fn test_each_list_opens_a_fresh_cursor() {
    let (store, service) = setup();
    create(&service, "a", "t", "c").await;

    let (first, _) = list(&service).await;
    create(&service, "b", "u", "d").await;
    let (second, _) = list(&service).await;

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 2);
    assert_eq!(store.wait_for_closes(2).await, 2);
}
