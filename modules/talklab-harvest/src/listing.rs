//! Listing stage: walk the paginated search index and assemble the ordered
//! slug list the rest of the pipeline is keyed on.

use std::collections::HashSet;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing::info;

use talklab_common::SortMode;
use ted_client::SearchPage;

use crate::traits::CatalogApi;

/// Collect the first `target_count` slugs under the given sort order.
///
/// Page 0 is fetched first to learn the total page count; the remaining
/// pages fan out through a bounded pool and are re-assembled in strict page
/// order regardless of completion order. Any single page failure fails the
/// stage. Pagination drift can repeat an item across pages, so duplicates
/// are dropped (first occurrence wins) before truncation.
pub async fn collect_slugs(
    api: &dyn CatalogApi,
    target_count: usize,
    sort: SortMode,
    page_size: usize,
    workers: usize,
) -> Result<Vec<String>> {
    let first = api
        .search_page(sort, 0)
        .await
        .context("listing page 0 fetch failed")?;
    let total_pages = first.total_pages as usize;

    let pages_needed = target_count.div_ceil(page_size.max(1));
    let last_page = pages_needed.min(total_pages).saturating_sub(1);

    let mut slugs = first.slugs;

    if last_page >= 1 {
        let fetched: Vec<Result<SearchPage>> =
            stream::iter((1..=last_page).map(|page| api.search_page(sort, page as u32)))
                .buffer_unordered(workers)
                .collect()
                .await;

        let mut pages = fetched
            .into_iter()
            .collect::<Result<Vec<_>>>()
            .context("listing page fetch failed")?;

        pages.sort_by_key(|p| p.page);
        for page in pages {
            slugs.extend(page.slugs);
        }
    }

    let mut seen = HashSet::new();
    slugs.retain(|slug| seen.insert(slug.clone()));
    slugs.truncate(target_count);

    info!(count = slugs.len(), %sort, "Fetched slugs");
    Ok(slugs)
}
