use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::cache::{self, Cache};
use crate::db::Repository;
use crate::error::Result;
use crate::models::{Entry, EntryPayload};
use crate::pagination::{PageLinks, PageRequest, Paginator};

/// Global cache key holding the total number of entries.
pub const ENTRY_COUNT_KEY: &str = "entry_count";

/// One page of the entry listing with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct EntryPage {
    pub count: u64,
    pub page_size: u32,
    pub total_pages: u64,
    pub current_page_number: u64,
    pub links: PageLinks,
    pub entries: Vec<Entry>,
}

/// Listing and submission of entries.
///
/// The total count behind the page metadata is cached under [`ENTRY_COUNT_KEY`]
/// for a fixed TTL and is not invalidated on writes, so `count` and
/// `total_pages` may trail the table by up to that TTL. Entry rows are always
/// read live.
#[derive(Clone)]
pub struct EntryService {
    repository: Repository,
    cache: Arc<dyn Cache>,
    paginator: Paginator,
    count_ttl: Duration,
}

impl EntryService {
    pub fn new(
        repository: Repository,
        cache: Arc<dyn Cache>,
        page_size: u32,
        count_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            paginator: Paginator::new(page_size),
            count_ttl,
        }
    }

    pub async fn list(&self, request: PageRequest, request_url: &Url) -> Result<EntryPage> {
        let count = self.entry_count().await?;
        let window = self.paginator.window(count, request)?;

        let entries = self
            .repository
            .list_entries(window.limit(), window.offset())
            .await?;
        tracing::debug!(
            "Listed page {}/{} with {} entries",
            window.number,
            window.total_pages,
            entries.len()
        );

        Ok(EntryPage {
            count,
            page_size: window.page_size,
            total_pages: window.total_pages,
            current_page_number: window.number,
            links: PageLinks::for_window(request_url, &window),
            entries,
        })
    }

    pub async fn create(&self, payload: EntryPayload) -> Result<Entry> {
        let entry = payload.validate()?;
        self.repository.create_entry(entry).await
    }

    async fn entry_count(&self) -> Result<u64> {
        if let Some(count) = cache::get_json::<u64>(self.cache.as_ref(), ENTRY_COUNT_KEY).await? {
            tracing::debug!("Entry count cache hit: {}", count);
            return Ok(count);
        }

        let count = self.repository.count_entries().await?;
        cache::set_json(self.cache.as_ref(), ENTRY_COUNT_KEY, &count, self.count_ttl).await?;
        tracing::debug!("Entry count cache miss, stored {}", count);
        Ok(count)
    }
}
