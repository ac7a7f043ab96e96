//! Page cursors
//!
//! A [`PageCursor`] is a lazy, forward-only, non-restartable producer of
//! one batch's records, one page at a time. It is implemented as an
//! explicit state machine over `Stream::poll_next` rather than a generator:
//! the cursor holds at most one in-flight page load, and a new pull is only
//! issued once the consumer has drained the previous page.

mod stream;

pub use stream::{PageContext, PageCursor};
