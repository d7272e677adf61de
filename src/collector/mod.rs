//! Paginated collection of one endpoint
//!
//! The collector walks an endpoint page by page:
//! - start at offset 0 with the configured page size and an unknown total
//! - before each fetch, stop if the cancellation token has fired
//! - fetch, normalize with the page's encoding, fold the page metadata into the cursor
//! - append the page's rows and stop once `offset >= total`
//!
//! Any failure ends the run but keeps every row gathered so far; the caller gets both
//! in a [`Collection`].

use crate::error::Error;
use crate::fetcher::PageSource;
use crate::normalize::normalize_page;
use crate::table::Table;
use crate::types::{Advance, Cursor, Endpoint};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

/// Outcome of collecting one endpoint
#[derive(Debug, Default)]
pub struct Collection {
    /// Rows gathered, in page order
    pub table: Table,
    /// Number of pages fetched
    pub pages: usize,
    /// The error that ended the run early, if any
    pub error: Option<Error>,
}

impl Collection {
    /// Returns true if every page was collected
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Drives a [`PageSource`] across every page of an endpoint
pub struct PaginatedCollector<'a, S: PageSource + ?Sized> {
    source: &'a S,
    page_size: u64,
    cancel: CancellationToken,
}

impl<'a, S: PageSource + ?Sized> PaginatedCollector<'a, S> {
    /// Create a collector requesting `page_size` records per page
    pub fn new(source: &'a S, page_size: u64) -> Self {
        Self {
            source,
            page_size,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop before the next fetch once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Cancellation token checked before every fetch
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Page size requested with the first page
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Collect every page of `endpoint`
    pub async fn collect(&self, endpoint: &Endpoint) -> Collection {
        let mut cursor = Cursor::start(self.page_size);
        let mut table = Table::new();
        let mut pages = 0usize;

        let error = loop {
            if self.cancel.is_cancelled() {
                break Some(Error::Cancelled);
            }

            let page = match self.source.fetch(endpoint, &cursor).await {
                Ok(page) => page,
                Err(e) => break Some(e),
            };
            pages += 1;

            let normalized = match normalize_page(&page, endpoint.resource()) {
                Ok(normalized) => normalized,
                Err(e) => break Some(e),
            };

            debug!(
                endpoint = %endpoint,
                offset = normalized.meta.offset,
                limit = normalized.meta.limit,
                total = normalized.meta.total,
                rows = normalized.table.len(),
                "Page normalized"
            );

            // Rows of a page whose metadata contradicts the run are not kept
            match cursor.advance(&normalized.meta) {
                Ok(Advance::Continue) => table.append(normalized.table),
                Ok(Advance::Done) => {
                    table.append(normalized.table);
                    break None;
                }
                Err(reason) => {
                    break Some(Error::Protocol {
                        url: page.url,
                        reason,
                    });
                }
            }
        };

        match &error {
            None => info!(
                endpoint = %endpoint,
                pages,
                rows = table.len(),
                total = cursor.total.unwrap_or(0),
                "Collection complete"
            ),
            Some(Error::Cancelled) => info!(
                endpoint = %endpoint,
                pages,
                rows = table.len(),
                "Collection cancelled"
            ),
            Some(e) => warn!(
                endpoint = %endpoint,
                pages,
                rows = table.len(),
                offset = cursor.offset,
                status = e.status(),
                error = %e,
                "Collection failed, keeping partial rows"
            ),
        }

        Collection {
            table,
            pages,
            error,
        }
    }
}
