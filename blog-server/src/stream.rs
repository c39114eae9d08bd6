/// ListBlogs stream producer
///
/// One producer task runs per ListBlogs call. It pulls documents from the
/// cursor one at a time, decodes them and pushes them into a bounded channel
/// that tonic drains towards the client. The producer stops when the cursor
/// is exhausted, on the first decode or cursor error, or as soon as the
/// client goes away. The cursor is held by a [`CursorGuard`], so it is
/// released exactly once whichever way the producer ends.

use blog_core::CursorGuard;
use blog_proto::ListBlogsRes;
use std::time::Instant;
use tokio::sync::mpsc;
use tonic::Status;
use tracing::{debug, warn};

use crate::convert::document_to_proto_blog;
use crate::metrics::{self, StreamGauge, STREAMED_RECORDS_TOTAL};

pub type StreamSender = mpsc::Sender<Result<ListBlogsRes, Status>>;

/// How a ListBlogs stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Cursor exhausted, every record sent
    Exhausted { sent: usize },
    /// Client disconnected before the cursor was exhausted
    Cancelled { sent: usize },
    /// An error status was sent and the stream aborted
    Failed { sent: usize },
}

/// Drive a cursor into the response channel until it ends
pub async fn stream_blogs(
    mut cursor: CursorGuard,
    tx: StreamSender,
    started: Instant,
) -> StreamEnd {
    let _gauge = StreamGauge::start();

    let end = pump(&mut cursor, &tx).await;
    cursor.close();

    match end {
        StreamEnd::Exhausted { sent } => debug!(sent, "ListBlogs stream completed"),
        StreamEnd::Cancelled { sent } => debug!(sent, "ListBlogs stream cancelled by client"),
        StreamEnd::Failed { sent } => warn!(sent, "ListBlogs stream aborted"),
    }
    metrics::observe_rpc("list_blogs", started, !matches!(end, StreamEnd::Failed { .. }));
    end
}

async fn pump(cursor: &mut CursorGuard, tx: &StreamSender) -> StreamEnd {
    let mut sent = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => return StreamEnd::Cancelled { sent },
            next = cursor.next() => next,
        };

        let doc = match next {
            Ok(Some(doc)) => doc,
            Ok(None) => return StreamEnd::Exhausted { sent },
            Err(e) => {
                let status = Status::internal(format!("Unknown cursor error: {}", e));
                return fail(tx, status, sent).await;
            }
        };

        let blog = match document_to_proto_blog(doc) {
            Ok(blog) => blog,
            Err(e) => {
                let status = Status::unavailable(format!("Could not decode data: {}", e));
                return fail(tx, status, sent).await;
            }
        };

        if tx.send(Ok(ListBlogsRes { blog: Some(blog) })).await.is_err() {
            return StreamEnd::Cancelled { sent };
        }
        sent += 1;
        STREAMED_RECORDS_TOTAL.inc();
    }
}

async fn fail(tx: &StreamSender, status: Status, sent: usize) -> StreamEnd {
    warn!(code = ?status.code(), "{}", status.message());
    metrics::observe_error(&status);
    // The client may already be gone; nothing else to do then
    let _ = tx.send(Err(status)).await;
    StreamEnd::Failed { sent }
}
