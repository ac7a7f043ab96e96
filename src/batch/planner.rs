//! Batch planning arithmetic
//!
//! Pure functions: no I/O, same plan for the same inputs every time.

use crate::config::MAX_NUM_BATCHES;
use crate::types::{BatchPlan, PageKey};

/// Partition a total result count (or an explicit caller limit) into a
/// bounded number of parallel batches.
///
/// An explicit `limit` takes precedence over the probed `total_count`, and
/// the batch count is recomputed against it afterwards so the batches never
/// overshoot a caller-imposed limit even when it does not divide evenly
/// into the page structure.
pub fn batching_params(
    total_count: Option<u64>,
    limit: Option<u64>,
    page_size: u32,
) -> BatchPlan {
    let total = limit.filter(|l| *l > 0).or(total_count).unwrap_or(0);
    if total == 0 || page_size == 0 {
        return BatchPlan::empty();
    }

    let page_size_wide = u64::from(page_size);
    let total_pages = total.div_ceil(page_size_wide);
    let mut num_batches = total_pages.min(u64::from(MAX_NUM_BATCHES));

    let results_per_batch = total.div_ceil(num_batches);
    let pages_per_batch = results_per_batch.div_ceil(page_size_wide);

    if let Some(limit) = limit {
        num_batches = limit.div_ceil(pages_per_batch * page_size_wide);
    }

    BatchPlan {
        num_batches: num_batches as u32,
        pages_per_batch: pages_per_batch as u32,
        page_size,
    }
}

/// Derive the per-batch page keys for a plan.
///
/// Batch `i` starts at `1 + i * pages_per_batch * page_size`. Every page
/// requests `page_size` records, except the last batch of a limited plan,
/// which requests exactly the remainder needed to hit the limit.
pub fn batch_page_keys(plan: &BatchPlan, limit: Option<u64>) -> Vec<PageKey> {
    let page_size = u64::from(plan.page_size);
    let pages_per_batch = u64::from(plan.pages_per_batch);
    let num_batches = u64::from(plan.num_batches);

    (0..num_batches)
        .map(|i| {
            let batch_start = i * pages_per_batch * page_size;
            let page_limit = match limit {
                Some(limit) if i == num_batches - 1 => batch_start.abs_diff(limit),
                _ => page_size,
            };
            PageKey::new(1 + batch_start, page_limit)
        })
        .collect()
}
