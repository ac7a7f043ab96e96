//! Tests for the merge engine

use super::*;
use crate::error::Error;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

fn record(cursor: u64, n: u64) -> Record {
    json!({"cursor": cursor, "n": n})
}

/// Stream yielding scripted items, optionally sleeping before each one
fn timed_stream(
    items: Vec<(u64, Result<Record>)>,
) -> BoxStream<'static, Result<Record>> {
    futures::stream::unfold(items.into_iter(), |mut items| async move {
        let (delay_ms, item) = items.next()?;
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        Some((item, items))
    })
    .boxed()
}

/// Three pages of three records each, all instant
fn nine_record_cursor(cursor: u64) -> BoxStream<'static, Result<Record>> {
    timed_stream((0..9).map(|n| (0, Ok(record(cursor, n)))).collect())
}

/// Wrapper counting how often the inner stream is polled
struct CountingStream<S> {
    inner: S,
    polls: Arc<AtomicUsize>,
}

impl<S: Stream + Unpin> Stream for CountingStream<S> {
    type Item = S::Item;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.polls.fetch_add(1, Ordering::SeqCst);
        Pin::new(&mut this.inner).poll_next(cx)
    }
}

// ============================================================================
// Unordered mode
// ============================================================================

#[tokio::test]
async fn test_unordered_merges_all_records_without_loss() {
    let cursors = vec![
        nine_record_cursor(0),
        nine_record_cursor(1),
        nine_record_cursor(2),
    ];
    let results: Vec<_> = merge(cursors, false).collect().await;

    let records: Vec<Record> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 27);

    // No duplicates or omissions, and order preserved within each cursor
    for cursor in 0..3u64 {
        let ns: Vec<u64> = records
            .iter()
            .filter(|r| r["cursor"] == cursor)
            .map(|r| r["n"].as_u64().unwrap())
            .collect();
        assert_eq!(ns, (0..9).collect::<Vec<_>>(), "cursor {cursor}");
    }
}

#[tokio::test]
async fn test_unordered_interleaves_by_readiness() {
    // Cursor 0 is slow; cursor 1 is instant. The fast cursor's records
    // must not wait for the slow one.
    let cursors = vec![
        timed_stream(vec![(80, Ok(record(0, 0)))]),
        timed_stream(vec![(0, Ok(record(1, 0))), (0, Ok(record(1, 1)))]),
    ];
    let records: Vec<Record> = merge(cursors, false)
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["cursor"], 1);
    assert_eq!(records[1]["cursor"], 1);
    assert_eq!(records[2]["cursor"], 0);
}

#[tokio::test]
async fn test_unordered_error_keeps_prior_records_visible() {
    // 3 batches x 2 pages x 3 records; batch 0 fails on its first load
    // after the sibling batches delivered their first pages. The sibling
    // second pages are still 200ms out when the error surfaces.
    let failing = timed_stream(vec![(50, Err(Error::page_load("p1", "boom")))]);
    let batch = |cursor: u64| {
        let mut items: Vec<(u64, Result<Record>)> =
            (0..3).map(|n| (0, Ok(record(cursor, n)))).collect();
        items.push((200, Ok(record(cursor, 3))));
        items.extend((4..6).map(|n| (0, Ok(record(cursor, n)))));
        timed_stream(items)
    };

    let results: Vec<_> = merge(vec![failing, batch(1), batch(2)], false)
        .collect()
        .await;

    // Exactly the six first-page records, then the error, then the end
    assert_eq!(results.len(), 7);
    let records: Vec<&Record> = results[..6]
        .iter()
        .map(|r| r.as_ref().unwrap())
        .collect();
    for cursor in 1..3u64 {
        let count = records.iter().filter(|r| r["cursor"] == cursor).count();
        assert_eq!(count, 3, "cursor {cursor} first page");
    }
    assert!(matches!(
        results[6].as_ref().unwrap_err(),
        Error::PageLoad { .. }
    ));
}

#[tokio::test]
async fn test_unordered_error_stops_further_pulls() {
    let yielded = Arc::new(AtomicUsize::new(0));
    let slow_batch = |cursor: u64, yielded: Arc<AtomicUsize>| {
        timed_stream(
            vec![
                (0, Ok(record(cursor, 0))),
                (200, Ok(record(cursor, 1))),
            ],
        )
        .inspect(move |_| {
            yielded.fetch_add(1, Ordering::SeqCst);
        })
        .boxed()
    };

    let failing = timed_stream(vec![(50, Err(Error::page_load("p1", "boom")))]);
    let cursors = vec![
        failing,
        slow_batch(1, Arc::clone(&yielded)),
        slow_batch(2, Arc::clone(&yielded)),
    ];

    let results: Vec<_> = merge(cursors, false).collect().await;
    assert!(results.last().unwrap().is_err());

    // The 200ms second records were never pulled: the fan-in tasks stop
    // once the fatal error propagates upward
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(yielded.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unordered_backpressure_bounds_readahead() {
    let yielded = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&yielded);
    let cursor = timed_stream((0..50).map(|n| (0, Ok(record(0, n)))).collect())
        .inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .boxed();

    let mut merged = merge_with_capacity(vec![cursor], false, 1);
    assert!(merged.next().await.unwrap().is_ok());

    // With one record consumed and a capacity-1 channel, the producer can
    // be at most one buffered item plus one in-hand ahead
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(yielded.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn test_unordered_drop_cancels_producers() {
    let yielded = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&yielded);
    let cursor = timed_stream(
        (0..10).map(|n| (30, Ok(record(0, n)))).collect(),
    )
    .inspect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .boxed();

    let mut merged = merge(vec![cursor], false);
    assert!(merged.next().await.unwrap().is_ok());
    drop(merged);

    tokio::time::sleep(Duration::from_millis(120)).await;
    let after_drop = yielded.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(yielded.load(Ordering::SeqCst), after_drop);
}

#[tokio::test]
async fn test_unordered_empty_cursor_list_ends_immediately() {
    let cursors: Vec<BoxStream<'static, Result<Record>>> = vec![];
    let results: Vec<_> = merge(cursors, false).collect().await;
    assert!(results.is_empty());
}

// ============================================================================
// Ordered mode
// ============================================================================

#[tokio::test]
async fn test_ordered_groups_strictly_by_cursor_index() {
    // Cursor 0 is slowest; ordering must hold anyway
    let slow_nine = |cursor: u64, delay: u64| {
        timed_stream((0..9).map(|n| (delay, Ok(record(cursor, n)))).collect())
    };
    let cursors = vec![slow_nine(0, 5), slow_nine(1, 0), slow_nine(2, 0)];

    let records: Vec<Record> = merge(cursors, true).map(|r| r.unwrap()).collect().await;
    assert_eq!(records.len(), 27);

    let cursor_sequence: Vec<u64> = records
        .iter()
        .map(|r| r["cursor"].as_u64().unwrap())
        .collect();
    let expected: Vec<u64> = (0..3).flat_map(|c| std::iter::repeat(c).take(9)).collect();
    assert_eq!(cursor_sequence, expected);
}

#[tokio::test]
async fn test_ordered_error_in_first_cursor_drains_nothing_else() {
    let polls_1 = Arc::new(AtomicUsize::new(0));
    let polls_2 = Arc::new(AtomicUsize::new(0));

    let failing = timed_stream(vec![(0, Err(Error::page_load("p1", "boom")))]);
    let counted = |polls: &Arc<AtomicUsize>| CountingStream {
        inner: nine_record_cursor(1),
        polls: Arc::clone(polls),
    };

    let cursors: Vec<BoxStream<'static, Result<Record>>> = vec![
        failing,
        counted(&polls_1).boxed(),
        counted(&polls_2).boxed(),
    ];
    let results: Vec<_> = merge(cursors, true).collect().await;

    // Zero records before the error, and the later cursors were never polled
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
    assert_eq!(polls_1.load(Ordering::SeqCst), 0);
    assert_eq!(polls_2.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ordered_error_mid_sequence_stops_permanently() {
    let cursors: Vec<BoxStream<'static, Result<Record>>> = vec![
        nine_record_cursor(0),
        timed_stream(vec![
            (0, Ok(record(1, 0))),
            (0, Err(Error::paging("bad next link"))),
        ]),
        nine_record_cursor(2),
    ];
    let results: Vec<_> = merge(cursors, true).collect().await;

    // Cursor 0 fully drained, one record from cursor 1, then the error
    assert_eq!(results.len(), 11);
    assert!(results[..10].iter().all(Result::is_ok));
    assert!(results[10].is_err());
}

#[tokio::test]
async fn test_ordered_empty_cursor_list_ends_immediately() {
    let cursors: Vec<BoxStream<'static, Result<Record>>> = vec![];
    let results: Vec<_> = merge(cursors, true).collect().await;
    assert!(results.is_empty());
}
