//! Batch stream construction

use super::planner;
use crate::cache;
use crate::config::PipelineConfig;
use crate::cursor::{PageContext, PageCursor};
use crate::error::Result;
use crate::types::{PageKey, SearchRequest};
use tracing::{debug, warn};

/// Builds the set of page cursors serving one search request.
///
/// Resolves the total match count (cached, else a zero-limit probe), plans
/// the batch structure, and seeds one cursor per batch. Cursors come back
/// ordered by ascending start index.
pub struct BatchStreamFactory {
    context: PageContext,
    config: PipelineConfig,
}

impl BatchStreamFactory {
    /// Create a factory over the given collaborators
    pub fn new(context: PageContext, config: PipelineConfig) -> Self {
        Self { context, config }
    }

    /// Build the ordered cursor list for a request.
    ///
    /// A zero or absent total yields an empty list. A probe failure
    /// propagates without constructing any cursor.
    pub async fn build(&self, request: &SearchRequest) -> Result<Vec<PageCursor>> {
        let total_count = self.resolve_total_count(request).await?;
        let limit = request.limit();

        let plan = planner::batching_params(Some(total_count), limit, self.config.page_size);
        let keys = planner::batch_page_keys(&plan, limit);
        debug!(
            "planned {} batches of {} pages for total {total_count}",
            plan.num_batches, plan.pages_per_batch
        );

        // A caller-supplied startindex shifts the whole key sequence
        let offset = request.start_index().unwrap_or(1).saturating_sub(1);
        let last = keys.len().saturating_sub(1);

        keys.into_iter()
            .enumerate()
            .map(|(i, key)| {
                let key = PageKey::new(key.start_index + offset, key.limit);
                // The precisely-sized last page of a limited plan is a
                // single-page batch; paging past it would overshoot
                let page_limit = if limit.is_some() && i == last {
                    1
                } else {
                    plan.pages_per_batch
                };
                let url = self.context.source.page_url(request, &key)?;
                Ok(PageCursor::new(self.context.clone(), url, page_limit))
            })
            .collect()
    }

    /// Total match count for a request: cache lookup by request hash, else
    /// the zero-limit probe, whose result is cached for the next caller
    async fn resolve_total_count(&self, request: &SearchRequest) -> Result<u64> {
        let key = cache::count_cache_key(request);

        if let Some(cached) = cache::lookup(&self.context.cache, &key).await {
            match cached.parse::<u64>() {
                Ok(count) => return Ok(count),
                Err(_) => warn!("discarding undecodable cached count under {key}"),
            }
        }

        let count = self.context.source.total_count(request).await?;
        cache::store(&self.context.cache, &key, &count.to_string()).await;
        Ok(count)
    }
}
