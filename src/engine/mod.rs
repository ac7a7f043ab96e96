//! Pipeline engine
//!
//! Ties the pieces together: resolve the total count, plan the batches,
//! seed one cursor per batch, and merge the cursors into the single output
//! stream handed to the caller. Ordered draining is chosen when the request
//! carries a sort criterion, unordered interleave otherwise.

use crate::batch::BatchStreamFactory;
use crate::cache::SharedCache;
use crate::config::PipelineConfig;
use crate::cursor::PageContext;
use crate::enrich::{NoopEnricher, RecordEnricher, SiteContext};
use crate::error::Result;
use crate::http::HttpClient;
use crate::merge::{merge_with_capacity, RecordStream};
use crate::source::{OgcSearchSource, PageSource};
use crate::types::SearchRequest;
use std::sync::Arc;
use tracing::debug;

/// The assembled search pipeline
pub struct SearchPipeline {
    factory: BatchStreamFactory,
    merge_capacity: usize,
}

impl SearchPipeline {
    /// Start building a pipeline
    pub fn builder() -> SearchPipelineBuilder {
        SearchPipelineBuilder::default()
    }

    /// Run a search and return the merged record stream.
    ///
    /// The stream yields every matching record (enriched), ending cleanly
    /// once all batches are drained or with the first fatal error. A probe
    /// failure surfaces here, before any cursor exists.
    pub async fn stream(&self, request: &SearchRequest) -> Result<RecordStream> {
        let cursors = self.factory.build(request).await?;
        let ordered = request.sort_requested();
        debug!(
            "merging {} cursors ({})",
            cursors.len(),
            if ordered { "ordered" } else { "unordered" }
        );
        Ok(merge_with_capacity(cursors, ordered, self.merge_capacity))
    }
}

/// Builder for [`SearchPipeline`]
pub struct SearchPipelineBuilder {
    source: Option<Arc<dyn PageSource>>,
    cache: SharedCache,
    enricher: Arc<dyn RecordEnricher>,
    site: SiteContext,
    config: PipelineConfig,
}

impl Default for SearchPipelineBuilder {
    fn default() -> Self {
        Self {
            source: None,
            cache: None,
            enricher: Arc::new(NoopEnricher),
            site: SiteContext::default(),
            config: PipelineConfig::default(),
        }
    }
}

impl SearchPipelineBuilder {
    /// Use a custom page source instead of the default OGC source
    #[must_use]
    pub fn source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach a response cache
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn crate::cache::CacheClient>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the per-record enrichment hook
    #[must_use]
    pub fn enricher(mut self, enricher: Arc<dyn RecordEnricher>) -> Self {
        self.enricher = enricher;
        self
    }

    /// Set the site context handed to the enrichment hook
    #[must_use]
    pub fn site(mut self, site: SiteContext) -> Self {
        self.site = site;
        self
    }

    /// Override the pipeline configuration
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble the pipeline
    pub fn build(self) -> SearchPipeline {
        let source = self.source.unwrap_or_else(|| {
            let http = HttpClient::with_config(self.config.http.to_client_config());
            Arc::new(OgcSearchSource::new(Arc::new(http)))
        });

        let context = PageContext {
            source,
            cache: self.cache,
            enricher: self.enricher,
            site: self.site,
        };
        let merge_capacity = self.config.merge_capacity;

        SearchPipeline {
            factory: BatchStreamFactory::new(context, self.config),
            merge_capacity,
        }
    }
}
