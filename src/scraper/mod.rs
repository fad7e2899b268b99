//! Page access: the fetch boundary, URL construction, field extraction and pagination.

mod client;
mod error;

pub mod extract;
pub mod paginate;

pub use client::{PoliteClient, PoliteClientBuilder, DEFAULT_USER_AGENT};
pub use error::{ScrapeError, StructureError};
pub use paginate::Pages;

use crate::text::slugify;
use reqwest::Url;
use scraper::{Html, Selector};

/// Site root used when no other base is configured.
pub const DEFAULT_BASE_URL: &str = "https://www.goodreads.com";

/// Anything that can turn a URL into a parsed document.
///
/// [`PoliteClient`] is the network implementation; tests serve canned pages.
pub trait PageSource {
    fn fetch(&mut self, url: &str) -> Result<Html, ScrapeError>;
}

impl<S: PageSource + ?Sized> PageSource for &mut S {
    fn fetch(&mut self, url: &str) -> Result<Html, ScrapeError> {
        (**self).fetch(url)
    }
}

/// Where an entity lives on the site: base URL plus path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub base: String,
    pub path: String,
}

impl PageLocation {
    pub fn new(base: &str, path: impl Into<String>) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            path: path.into(),
        }
    }

    pub fn author_show(base: &str, id: &str, name: &str) -> Self {
        Self::new(base, format!("/author/show/{}.{}", id, slugify(name)))
    }

    /// Author page addressed by id only; the site redirects to the canonical slug.
    pub fn author_show_by_id(base: &str, id: &str) -> Self {
        Self::new(base, format!("/author/show/{}", id))
    }

    pub fn author_books(base: &str, id: &str, name: &str) -> Self {
        Self::new(base, format!("/author/list/{}.{}", id, slugify(name)))
    }

    pub fn author_quotes(base: &str, id: &str, name: &str) -> Self {
        Self::new(base, format!("/author/quotes/{}.{}", id, slugify(name)))
    }

    pub fn author_similar(base: &str, id: &str, name: &str) -> Self {
        Self::new(base, format!("/author/similar/{}.{}", id, slugify(name)))
    }

    pub fn book_show(base: &str, id: &str, name: &str) -> Self {
        Self::new(base, format!("/book/show/{}.{}", id, slugify(name)))
    }

    /// Location of an href found on a page. Relative hrefs are resolved against `base`.
    pub fn from_href(base: &str, href: &str) -> Result<Self, ScrapeError> {
        let invalid = |reason: String| ScrapeError::InvalidUrl {
            input: href.to_string(),
            reason,
        };
        let root = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        let url = root.join(href).map_err(|e| invalid(e.to_string()))?;
        let origin = url.origin().ascii_serialization();
        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        Ok(Self::new(&origin, path))
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base, self.path)
    }

    /// URL of page `n` of a paginated listing; page 1 carries no suffix.
    pub fn page_url(&self, n: u32) -> String {
        format!("{}{}", self.url(), page_suffix(&self.path, n))
    }
}

/// Query suffix selecting page `n` (`?page=n`), empty for the first page.
pub fn page_suffix(path: &str, n: u32) -> String {
    if n <= 1 {
        String::new()
    } else if path.contains('?') {
        format!("&page={}", n)
    } else {
        format!("?page={}", n)
    }
}

/// Parse a CSS selector or return a structure error (avoids panics from Selector::parse).
pub(crate) fn parse_selector(sel: &str) -> Result<Selector, StructureError> {
    Selector::parse(sel).map_err(|e| StructureError {
        field: "selector",
        reason: format!("invalid selector {:?}: {}", sel, e),
    })
}
