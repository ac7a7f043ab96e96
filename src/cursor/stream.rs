//! The page cursor state machine

use crate::cache::{self, SharedCache};
use crate::enrich::{RecordEnricher, SiteContext};
use crate::error::Result;
use crate::source::PageSource;
use crate::types::{JsonValue, Record};
use futures::future::BoxFuture;
use futures::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, warn};

/// Collaborators shared by every cursor of one search
#[derive(Clone)]
pub struct PageContext {
    /// The paginated endpoint
    pub source: Arc<dyn PageSource>,
    /// Optional response cache
    pub cache: SharedCache,
    /// Per-record enrichment hook
    pub enricher: Arc<dyn RecordEnricher>,
    /// Site details handed to the hook
    pub site: SiteContext,
}

impl std::fmt::Debug for PageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("has_cache", &self.cache.is_some())
            .field("site", &self.site)
            .finish_non_exhaustive()
    }
}

/// One fetched page, ready to stream
struct LoadedPage {
    payload: JsonValue,
    records: Vec<Record>,
}

enum State {
    /// URL of the page to pull when the consumer asks for more
    Next(String),
    /// Exactly one page load in flight
    Loading(BoxFuture<'static, Result<LoadedPage>>),
    /// Terminal: end of data, page limit hit, or a fatal error surfaced
    Finished,
}

/// Pull-based producer of one batch's records.
///
/// Yields `Result<Record>`; the first error is terminal. Dropping the
/// cursor cancels any in-flight page load.
pub struct PageCursor {
    context: PageContext,
    page_limit: u32,
    pages_consumed: u32,
    pending: VecDeque<Record>,
    state: State,
}

impl std::fmt::Debug for PageCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCursor")
            .field("context", &self.context)
            .field("page_limit", &self.page_limit)
            .field("pages_consumed", &self.pages_consumed)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl PageCursor {
    /// Create a cursor over a page-key sequence starting at `first_page_url`,
    /// consuming at most `page_limit` pages
    pub fn new(context: PageContext, first_page_url: impl Into<String>, page_limit: u32) -> Self {
        Self {
            context,
            page_limit,
            pages_consumed: 0,
            pending: VecDeque::new(),
            state: State::Next(first_page_url.into()),
        }
    }

    /// Create a cursor that follows next links until the source runs dry
    pub fn unbounded(context: PageContext, first_page_url: impl Into<String>) -> Self {
        Self::new(context, first_page_url, u32::MAX)
    }

    /// Pages fetched so far
    pub fn pages_consumed(&self) -> u32 {
        self.pages_consumed
    }
}

impl Stream for PageCursor {
    type Item = Result<Record>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(record) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(record)));
            }

            match &mut this.state {
                State::Finished => return Poll::Ready(None),
                State::Next(_) => {
                    if this.pages_consumed >= this.page_limit {
                        this.state = State::Finished;
                        continue;
                    }
                    if let State::Next(url) = std::mem::replace(&mut this.state, State::Finished) {
                        let fut = fetch_page(this.context.clone(), url);
                        this.state = State::Loading(Box::pin(fut));
                    }
                }
                State::Loading(fut) => match fut.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Err(e)) => {
                        this.state = State::Finished;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Ready(Ok(page)) => {
                        this.pages_consumed += 1;
                        let next = match this.context.source.next_page_url(&page.payload) {
                            Ok(next) => next,
                            Err(e) => {
                                this.state = State::Finished;
                                return Poll::Ready(Some(Err(e)));
                            }
                        };

                        debug!(
                            "page {} of {} streamed {} records",
                            this.pages_consumed,
                            this.page_limit,
                            page.records.len()
                        );
                        this.pending.extend(page.records);

                        this.state = match next {
                            Some(url) if this.pages_consumed < this.page_limit => State::Next(url),
                            _ => State::Finished,
                        };
                    }
                },
            }
        }
    }
}

/// Resolve one page: cache lookup, else live fetch + enrich + store.
///
/// Pages are cached post-enrichment so a hit replays without another hook
/// call. An unreadable cache entry counts as a miss.
async fn fetch_page(context: PageContext, page_url: String) -> Result<LoadedPage> {
    let key = cache::page_cache_key(&page_url);

    if let Some(cached) = cache::lookup(&context.cache, &key).await {
        match serde_json::from_str::<JsonValue>(&cached) {
            Ok(payload) => {
                let records = context.source.extract_records(&payload)?;
                return Ok(LoadedPage { payload, records });
            }
            Err(e) => warn!("discarding undecodable cache entry for {key}: {e}"),
        }
    }

    let payload = context.source.load_page(&page_url).await?;

    let raw_records = context.source.extract_records(&payload)?;
    let mut records = Vec::with_capacity(raw_records.len());
    for record in raw_records {
        records.push(context.enricher.enrich(record, &context.site)?);
    }

    let payload = if context.cache.is_some() {
        let enriched = context.source.embed_records(payload, records.clone())?;
        let serialized = serde_json::to_string(&enriched)?;
        cache::store(&context.cache, &key, &serialized).await;
        enriched
    } else {
        payload
    };

    Ok(LoadedPage { payload, records })
}
