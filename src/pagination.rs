//! Page-number pagination with absolute navigation links.

use std::collections::HashMap;

use serde::Serialize;
use url::Url;

use crate::config::PaginationConfig;
use crate::error::AppError;

/// Keyword accepted in place of a page number to jump to the final page.
const LAST_PAGE: &str = "last";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Links {
    pub current: String,
    pub first: Option<String>,
    pub last: Option<String>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// Response envelope for every list endpoint.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub links: Links,
    pub count: u64,
    pub results: Vec<T>,
}

/// The slice of a collection a request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub number: u64,
    pub num_pages: u64,
    pub size: u64,
}

impl Window {
    pub fn limit(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.size
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}

pub struct Paginator<'a> {
    config: &'a PaginationConfig,
}

impl<'a> Paginator<'a> {
    pub fn new(config: &'a PaginationConfig) -> Self {
        Self { config }
    }

    /// Page size requested by the client, clamped to the configured maximum.
    /// Anything that is not a positive integer falls back to the default.
    pub fn page_size(&self, query: &HashMap<String, String>) -> u64 {
        let default = u64::from(self.config.page_size.max(1));
        if self.config.page_size_query_param.is_empty() {
            return default;
        }

        match query
            .get(&self.config.page_size_query_param)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
        {
            Some(size) if size > 0 => size.min(u64::from(self.config.max_page_size.max(1))),
            _ => default,
        }
    }

    /// Resolve the requested page against a collection of `count` records.
    /// An empty collection still has a first page.
    pub fn window(&self, query: &HashMap<String, String>, count: u64) -> Result<Window, AppError> {
        let size = self.page_size(query);
        let num_pages = count.div_ceil(size).max(1);

        let number = match query.get(&self.config.page_query_param).map(|s| s.trim()) {
            None | Some("") => 1,
            Some(LAST_PAGE) => num_pages,
            Some(raw) => raw.parse::<u64>().map_err(|_| AppError::InvalidPage)?,
        };

        if number == 0 || number > num_pages {
            return Err(AppError::InvalidPage);
        }

        Ok(Window {
            number,
            num_pages,
            size,
        })
    }

    pub fn links(&self, current: &Url, window: &Window) -> Links {
        let to = |page: u64| self.page_url(current, page);
        Links {
            current: current.to_string(),
            first: window.has_previous().then(|| to(1)),
            last: window.has_next().then(|| to(window.num_pages)),
            next: window.has_next().then(|| to(window.number + 1)),
            previous: window.has_previous().then(|| to(window.number - 1)),
        }
    }

    pub fn page<T>(&self, current: &Url, window: &Window, count: u64, results: Vec<T>) -> Page<T> {
        Page {
            links: self.links(current, window),
            count,
            results,
        }
    }

    /// `current` with the page parameter rewritten, every other parameter kept.
    fn page_url(&self, current: &Url, page: u64) -> String {
        let param = self.config.page_query_param.as_str();
        let kept: Vec<(String, String)> = current
            .query_pairs()
            .filter(|(key, _)| key != param)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = current.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(param, &page.to_string());
        url.to_string()
    }
}
