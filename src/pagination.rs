use serde::Serialize;
use url::Url;

use crate::error::{AppError, Result};

pub const PAGE_PARAM: &str = "page";

/// The `page` query parameter after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(u64),
    Last,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::Number(1)
    }
}

impl PageRequest {
    /// Absent means the first page; anything but a positive integer or `last` is out of range.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(PageRequest::default());
        };
        if raw == "last" {
            return Ok(PageRequest::Last);
        }
        raw.parse::<u64>()
            .ok()
            .filter(|n| *n >= 1)
            .map(PageRequest::Number)
            .ok_or_else(|| AppError::OutOfRange {
                page: raw.to_string(),
            })
    }
}

/// A validated position in the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub total_pages: u64,
    pub page_size: u32,
}

impl PageWindow {
    pub fn offset(&self) -> u64 {
        (self.number - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: u32,
}

impl Paginator {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn total_pages(&self, count: u64) -> u64 {
        count.div_ceil(u64::from(self.page_size))
    }

    /// Resolves a request against `count` items. Page 1 is always valid, even when empty.
    pub fn window(&self, count: u64, request: PageRequest) -> Result<PageWindow> {
        let total_pages = self.total_pages(count);
        let last_valid = total_pages.max(1);
        let number = match request {
            PageRequest::Number(n) => n,
            PageRequest::Last => last_valid,
        };

        if number == 0 || number > last_valid {
            return Err(AppError::OutOfRange {
                page: number.to_string(),
            });
        }

        Ok(PageWindow {
            number,
            total_pages,
            page_size: self.page_size,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl PageLinks {
    /// Links relative to the URL of the current request; other query parameters are kept.
    pub fn for_window(request_url: &Url, window: &PageWindow) -> Self {
        Self {
            next: window
                .has_next()
                .then(|| page_url(request_url, window.number + 1)),
            previous: window
                .has_previous()
                .then(|| page_url(request_url, window.number - 1)),
        }
    }
}

fn page_url(request_url: &Url, page: u64) -> String {
    let kept: Vec<(String, String)> = request_url
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = request_url.clone();
    url.set_query(None);

    // The first page is linked without a page parameter.
    if !kept.is_empty() || page > 1 {
        let mut query = url.query_pairs_mut();
        query.extend_pairs(kept);
        if page > 1 {
            query.append_pair(PAGE_PARAM, &page.to_string());
        }
    }

    url.to_string()
}
