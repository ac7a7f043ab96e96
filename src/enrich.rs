//! Per-record enrichment hook
//!
//! Enrichment is a pure transform of a raw record plus site context into an
//! enriched record. The engine treats it as opaque: it is invoked exactly
//! once per record, on the cache-miss path, before the enriched page is
//! serialized and stored. Cached pages are therefore already enriched and
//! replay without another hook call.

use crate::error::Result;
use crate::types::Record;

/// Site details handed to the enrichment hook alongside each record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteContext {
    /// Public URL of the site the records belong to
    pub site_url: String,
    /// URL of the backing portal
    pub portal_url: String,
    /// Base URL of the owning organization
    pub org_base_url: String,
    /// Display title of the owning organization
    pub org_title: String,
}

impl SiteContext {
    /// Context for a site URL with no portal/org details
    pub fn for_site(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            ..Self::default()
        }
    }
}

/// Transform applied to every record before it enters the cache and the
/// output stream
pub trait RecordEnricher: Send + Sync {
    /// Enrich one record. Errors are fatal to the owning cursor.
    fn enrich(&self, record: Record, site: &SiteContext) -> Result<Record>;
}

impl<F> RecordEnricher for F
where
    F: Fn(Record, &SiteContext) -> Result<Record> + Send + Sync,
{
    fn enrich(&self, record: Record, site: &SiteContext) -> Result<Record> {
        self(record, site)
    }
}

/// Enricher that returns records unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

impl RecordEnricher for NoopEnricher {
    fn enrich(&self, record: Record, _site: &SiteContext) -> Result<Record> {
        Ok(record)
    }
}
