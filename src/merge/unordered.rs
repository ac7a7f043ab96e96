//! Concurrent fan-in merge

use crate::error::Result;
use crate::types::Record;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// First-ready-first-served interleave of cursor streams.
///
/// One task per cursor forwards records into a bounded channel, so a slow
/// consumer suspends every producer instead of buffering unboundedly. The
/// merged stream ends once every cursor has ended. The first error is
/// forwarded exactly once and terminates the stream; a shared fatal flag
/// stops the remaining cursors from issuing new pulls, though records they
/// already had in flight may still have reached the channel.
pub struct UnorderedMerge {
    rx: mpsc::Receiver<Result<Record>>,
    tasks: Vec<JoinHandle<()>>,
    done: bool,
}

impl UnorderedMerge {
    /// Spawn one forwarding task per cursor
    pub fn spawn<S>(cursors: Vec<S>, capacity: usize) -> Self
    where
        S: Stream<Item = Result<Record>> + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let fatal = Arc::new(AtomicBool::new(false));

        let tasks = cursors
            .into_iter()
            .enumerate()
            .map(|(index, mut cursor)| {
                let tx = tx.clone();
                let fatal = Arc::clone(&fatal);
                tokio::spawn(async move {
                    while !fatal.load(Ordering::SeqCst) {
                        let Some(item) = cursor.next().await else {
                            debug!("cursor {index} drained");
                            break;
                        };
                        let is_err = item.is_err();
                        if is_err {
                            fatal.store(true, Ordering::SeqCst);
                        }
                        if tx.send(item).await.is_err() {
                            // Consumer went away; stop pulling
                            break;
                        }
                        if is_err {
                            break;
                        }
                    }
                })
            })
            .collect();

        Self { rx, tasks, done: false }
    }

    fn abort_tasks(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Stream for UnorderedMerge {
    type Item = Result<Record>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match this.rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                // Every producer finished and dropped its sender
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Ok(record))) => Poll::Ready(Some(Ok(record))),
            Poll::Ready(Some(Err(e))) => {
                this.done = true;
                this.rx.close();
                this.abort_tasks();
                Poll::Ready(Some(Err(e)))
            }
        }
    }
}

impl Drop for UnorderedMerge {
    fn drop(&mut self) {
        // Consumer-initiated termination: stop all pending pulls
        self.abort_tasks();
    }
}
