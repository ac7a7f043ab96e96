//! Strict-order merge

use crate::error::Result;
use crate::types::Record;
use futures::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Sequential concatenation of cursor streams.
///
/// The output does not advance to cursor `i + 1` until cursor `i` has fully
/// ended, so exactly one cursor (and within it exactly one page load) is in
/// flight at any time. An error stops the merge permanently: no subsequent
/// cursor is ever drained.
pub struct OrderedMerge<S> {
    streams: VecDeque<S>,
}

impl<S> OrderedMerge<S> {
    /// Create a merge over cursors in list order
    pub fn new(streams: Vec<S>) -> Self {
        Self {
            streams: streams.into(),
        }
    }
}

impl<S> Stream for OrderedMerge<S>
where
    S: Stream<Item = Result<Record>> + Unpin,
{
    type Item = Result<Record>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let Some(front) = this.streams.front_mut() else {
                return Poll::Ready(None);
            };

            match Pin::new(front).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    this.streams.pop_front();
                }
                Poll::Ready(Some(Ok(record))) => return Poll::Ready(Some(Ok(record))),
                Poll::Ready(Some(Err(e))) => {
                    // Dropping the remaining cursors releases them without
                    // further upstream calls
                    this.streams.clear();
                    return Poll::Ready(Some(Err(e)));
                }
            }
        }
    }
}
