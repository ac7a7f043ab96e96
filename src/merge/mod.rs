//! Stream merging
//!
//! Combines N independent page-cursor streams into one output stream.
//!
//! Unordered mode runs every cursor concurrently and interleaves records
//! first-ready-first-served through a bounded fan-in channel; ordered mode
//! drains cursors strictly in list order, which preserves cross-batch
//! record order when the caller's sort key was pushed down to each batch's
//! query. Both modes propagate the first fatal error exactly once and stop
//! issuing new pulls once it surfaces.

mod ordered;
mod unordered;

pub use ordered::OrderedMerge;
pub use unordered::UnorderedMerge;

use crate::config::DEFAULT_MERGE_CAPACITY;
use crate::error::Result;
use crate::types::Record;
use futures::Stream;
use std::pin::Pin;

/// Boxed output stream handed to the consumer
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record>> + Send>>;

/// Merge a set of cursors into one output stream
pub fn merge<S>(cursors: Vec<S>, ordered: bool) -> RecordStream
where
    S: Stream<Item = Result<Record>> + Send + Unpin + 'static,
{
    merge_with_capacity(cursors, ordered, DEFAULT_MERGE_CAPACITY)
}

/// Merge with an explicit fan-in channel capacity (unordered mode only;
/// ordered draining needs no buffer)
pub fn merge_with_capacity<S>(cursors: Vec<S>, ordered: bool, capacity: usize) -> RecordStream
where
    S: Stream<Item = Result<Record>> + Send + Unpin + 'static,
{
    if ordered {
        Box::pin(OrderedMerge::new(cursors))
    } else {
        Box::pin(UnorderedMerge::spawn(cursors, capacity))
    }
}

#[cfg(test)]
mod tests;
