//! # pagefan
//!
//! A Rust-native engine for streaming large, unbounded result sets out of
//! remote paginated search APIs as a single record stream.
//!
//! ## Features
//!
//! - **Batched Fan-Out**: Partitions an unknown-until-queried total into a
//!   bounded number of parallel fetch batches (at most 5)
//! - **Pull-Based Cursors**: One lazy page cursor per batch, one in-flight
//!   page load per cursor, backpressure all the way up
//! - **Ordered or Unordered Merge**: First-ready interleave for throughput,
//!   strict batch-order draining when the caller asked for a sort
//! - **Page Caching**: Optional response cache consulted per page; cache
//!   failures degrade to live fetches
//! - **Enrichment Hook**: A pure per-record transform applied exactly once,
//!   before the page enters the cache
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use pagefan::{SearchPipeline, SearchRequest};
//!
//! #[tokio::main]
//! async fn main() -> pagefan::Result<()> {
//!     let pipeline = SearchPipeline::builder().build();
//!
//!     let request = SearchRequest::with_query(
//!         "https://data.example.com",
//!         "datasets",
//!         [("q", "water"), ("limit", "825")],
//!     );
//!
//!     let mut records = pipeline.stream(&request).await?;
//!     while let Some(record) = records.next().await {
//!         println!("{}", record?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       SearchPipeline                         │
//! │        stream(request) → Stream<Result<Record>>              │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────────┬──────────────┴──────────────┬────────────────┐
//! │ BatchPlanner │     BatchStreamFactory      │  StreamMerger  │
//! ├──────────────┼─────────────────────────────┼────────────────┤
//! │ total → plan │ probe / cached count        │ unordered fan-in│
//! │ page keys    │ one PageCursor per batch    │ ordered drain  │
//! └──────────────┴─────────────────────────────┴────────────────┘
//!                               │
//!          N × PageCursor ── cache? ── enrich ── emit
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the crate
pub mod error;

/// Common types and type aliases
pub mod types;

/// Pipeline configuration and process-wide constants
pub mod config;

/// Response caching
pub mod cache;

/// HTTP client with retry and rate limiting
pub mod http;

/// Per-record enrichment hook
pub mod enrich;

/// Paginated page sources
pub mod source;

/// Page cursors
pub mod cursor;

/// Batch planning and construction
pub mod batch;

/// Stream merging
pub mod merge;

/// The assembled pipeline
pub mod engine;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::{BatchPlan, PageKey, Record, SearchRequest};

pub use cache::{CacheClient, MemoryCache, NoopCache};
pub use config::{PipelineConfig, DEFAULT_PAGE_SIZE, MAX_NUM_BATCHES};
pub use cursor::{PageContext, PageCursor};
pub use engine::{SearchPipeline, SearchPipelineBuilder};
pub use enrich::{NoopEnricher, RecordEnricher, SiteContext};
pub use merge::{merge, RecordStream};
pub use source::{OgcSearchSource, PageSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
