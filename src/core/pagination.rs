//! Offset/limit page walking.
//!
//! Every listing endpoint of the CRM API answers with a bounded page plus a
//! `more_items_in_collection` / `next_start` pair. [`PaginatedFetcher::deplete`]
//! keeps asking for the next page until the source says it is done, and hands
//! back every record in the order the API produced them. Any unsuccessful page
//! discards what was collected so far.

use crate::domain::model::{ListResponse, PageRequest, QueryParams};
use crate::utils::error::{Result, SyncError};
use std::future::Future;

pub const DEFAULT_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Copy)]
pub struct PaginatedFetcher {
    page_size: u32,
}

impl Default for PaginatedFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PaginatedFetcher {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Fetch every page of `endpoint`. `fetch` is called once per page with a
    /// new [`PageRequest`] carrying the offset, the page size and a copy of
    /// `params`.
    pub async fn deplete<T, F, Fut>(
        &self,
        endpoint: &str,
        params: &QueryParams,
        mut fetch: F,
    ) -> Result<Vec<T>>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<ListResponse<T>>>,
    {
        let mut records = Vec::new();
        let mut start = 0u64;
        let mut pages = 0usize;

        loop {
            let request = PageRequest::new(start, self.page_size, params);
            tracing::debug!("Requesting {} page at offset {}", endpoint, start);

            let response = fetch(request)
                .await
                .map_err(|e| SyncError::pagination(endpoint, e.to_string()))?;
            let page = Self::successful(endpoint, response)?;
            pages += 1;

            let more = page
                .pagination()
                .map(|p| (p.more_items_in_collection, p.next_start))
                .unwrap_or((false, None));

            let received = page.data.as_ref().map_or(0, Vec::len);
            if let Some(data) = page.data {
                records.extend(data);
            }

            match more {
                (false, _) => break,
                (true, _) if received == 0 => {
                    return Err(SyncError::pagination(
                        endpoint,
                        format!("empty page at offset {} announced more items", start),
                    ));
                }
                (true, Some(next)) if next > start => start = next,
                (true, next) => {
                    return Err(SyncError::pagination(
                        endpoint,
                        format!(
                            "pagination did not advance past offset {} (next_start: {:?})",
                            start, next
                        ),
                    ));
                }
            }
        }

        tracing::debug!(
            "Fetched {} records from {} in {} page(s)",
            records.len(),
            endpoint,
            pages
        );
        Ok(records)
    }

    /// Single-shot variant for endpoints that return the whole collection at once.
    pub async fn fetch_all<T, F, Fut>(&self, endpoint: &str, fetch: F) -> Result<Vec<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ListResponse<T>>>,
    {
        let response = fetch()
            .await
            .map_err(|e| SyncError::pagination(endpoint, e.to_string()))?;
        let response = Self::successful(endpoint, response)?;
        Ok(response.data.unwrap_or_default())
    }

    fn successful<T>(endpoint: &str, response: ListResponse<T>) -> Result<ListResponse<T>> {
        if response.success {
            return Ok(response);
        }
        let reason = match response.error {
            Some(error) => format!("API call not successful: {}", error),
            None => "API call not successful".to_string(),
        };
        Err(SyncError::pagination(endpoint, reason))
    }
}
