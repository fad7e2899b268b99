//! Lazy walk over a numbered listing (`?page=2`, `?page=3`, ...).
//!
//! The site gives no "last page" signal: the first page that yields no items ends the listing.
//! A page whose item container is missing counts as empty. Fetch and structure failures are
//! returned once and end the walk; there is no retry here beyond the optional empty-page retry.

use crate::scraper::{PageLocation, PageSource, ScrapeError, StructureError};
use scraper::Html;
use std::collections::VecDeque;

/// Iterator over the items of every page of a listing, in page order then document order.
///
/// Pages are fetched only when the buffered items run out, so stopping early (e.g. with
/// `take(n)`) stops fetching. Creating a new walker always starts again from page 1.
pub struct Pages<'s, S: ?Sized, T, F> {
    source: &'s mut S,
    location: PageLocation,
    extract: F,
    page: u32,
    buffer: VecDeque<T>,
    done: bool,
    empty_page_retries: u32,
}

/// Start walking `location` from page 1, running `extract` on each fetched page.
pub fn walk<'s, S, T, F>(source: &'s mut S, location: PageLocation, extract: F) -> Pages<'s, S, T, F>
where
    S: PageSource + ?Sized,
    F: FnMut(&Html) -> Result<Vec<T>, StructureError>,
{
    Pages::new(source, location, extract)
}

impl<'s, S, T, F> Pages<'s, S, T, F>
where
    S: PageSource + ?Sized,
    F: FnMut(&Html) -> Result<Vec<T>, StructureError>,
{
    pub fn new(source: &'s mut S, location: PageLocation, extract: F) -> Self {
        Self {
            source,
            location,
            extract,
            page: 0,
            buffer: VecDeque::new(),
            done: false,
            empty_page_retries: 0,
        }
    }

    /// Re-fetch an empty page up to `n` times before accepting it as the end of the listing.
    pub fn empty_page_retries(mut self, n: u32) -> Self {
        self.empty_page_retries = n;
        self
    }

    /// True once the end of the listing was reached or a failure was returned.
    pub fn is_exhausted(&self) -> bool {
        self.done && self.buffer.is_empty()
    }

    fn fetch_next_page(&mut self) -> Result<(), ScrapeError> {
        self.page += 1;
        let url = self.location.page_url(self.page);
        let mut retries = 0;
        loop {
            let doc = self.source.fetch(&url)?;
            let items = (self.extract)(&doc).map_err(|e| e.at(&url))?;
            if !items.is_empty() {
                tracing::debug!("{} items on page {} of {}", items.len(), self.page, self.location.path);
                self.buffer.extend(items);
                return Ok(());
            }
            if retries < self.empty_page_retries {
                retries += 1;
                tracing::debug!("Page {} empty, retry {}/{}", self.page, retries, self.empty_page_retries);
                continue;
            }
            tracing::debug!("End of listing {} at page {}", self.location.path, self.page);
            self.done = true;
            return Ok(());
        }
    }
}

impl<S, T, F> Iterator for Pages<'_, S, T, F>
where
    S: PageSource + ?Sized,
    F: FnMut(&Html) -> Result<Vec<T>, StructureError>,
{
    type Item = Result<T, ScrapeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch_next_page() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::parse_selector;
    use crate::testing::StubSource;

    const BASE: &str = "https://stub.test";

    fn list_page(items: &[&str]) -> String {
        let lis: String = items.iter().map(|i| format!("<li>{}</li>", i)).collect();
        format!("<html><body><ul class=\"items\">{}</ul></body></html>", lis)
    }

    fn items(doc: &Html) -> Result<Vec<String>, StructureError> {
        let sel = parse_selector("ul.items li")?;
        Ok(doc.select(&sel).map(|li| li.text().collect()).collect())
    }

    fn location() -> PageLocation {
        PageLocation::new(BASE, "/list/1.X")
    }

    fn three_pages() -> StubSource {
        let mut source = StubSource::new();
        source.page(&format!("{}/list/1.X", BASE), list_page(&["a", "b", "c"]));
        source.page(&format!("{}/list/1.X?page=2", BASE), list_page(&["d", "e"]));
        source.page(&format!("{}/list/1.X?page=3", BASE), list_page(&[]));
        source
    }

    #[test]
    fn walks_until_first_empty_page() -> Result<(), ScrapeError> {
        let mut source = three_pages();
        let got: Vec<String> = walk(&mut source, location(), items).collect::<Result<_, _>>()?;
        assert_eq!(got, ["a", "b", "c", "d", "e"]);
        assert_eq!(
            source.requests(),
            [
                "https://stub.test/list/1.X",
                "https://stub.test/list/1.X?page=2",
                "https://stub.test/list/1.X?page=3"
            ]
        );
        Ok(())
    }

    #[test]
    fn stopping_early_stops_fetching() -> Result<(), ScrapeError> {
        let mut source = three_pages();
        let got: Vec<String> = walk(&mut source, location(), items)
            .take(3)
            .collect::<Result<_, _>>()?;
        assert_eq!(got, ["a", "b", "c"]);
        assert_eq!(source.fetch_count(), 1);
        Ok(())
    }

    #[test]
    fn walking_again_refetches() -> Result<(), ScrapeError> {
        let mut source = three_pages();
        let first = walk(&mut source, location(), items).count();
        let second = walk(&mut source, location(), items).count();
        assert_eq!(first, 5);
        assert_eq!(second, 5);
        assert_eq!(source.fetch_count(), 6);
        Ok(())
    }

    #[test]
    fn malformed_page_ends_listing() -> Result<(), ScrapeError> {
        let mut source = StubSource::new();
        source.page(&format!("{}/list/1.X", BASE), list_page(&["a"]));
        source.page(
            &format!("{}/list/1.X?page=2", BASE),
            "<html><body><p>maintenance</p></body></html>".to_string(),
        );
        let got: Vec<String> = walk(&mut source, location(), items).collect::<Result<_, _>>()?;
        assert_eq!(got, ["a"]);
        assert_eq!(source.fetch_count(), 2);
        Ok(())
    }

    #[test]
    fn fetch_failure_is_returned_once() {
        let mut source = StubSource::new();
        source.page(&format!("{}/list/1.X", BASE), list_page(&["a", "b"]));
        let mut pages = walk(&mut source, location(), items);
        assert_eq!(pages.next().map(|r| r.is_ok()), Some(true));
        assert_eq!(pages.next().map(|r| r.is_ok()), Some(true));
        match pages.next() {
            Some(Err(e)) => assert!(e.is_network()),
            other => panic!("expected network error, got {:?}", other.map(|r| r.is_ok())),
        }
        assert!(pages.next().is_none());
        assert!(pages.is_exhausted());
    }

    #[test]
    fn structure_error_carries_url() {
        let mut source = StubSource::new();
        source.page(&format!("{}/list/1.X", BASE), list_page(&["a"]));
        let failing = |_: &Html| -> Result<Vec<String>, StructureError> {
            Err(StructureError::missing("item"))
        };
        let mut pages = walk(&mut source, location(), failing);
        match pages.next() {
            Some(Err(ScrapeError::Structure { url, field, .. })) => {
                assert_eq!(url, "https://stub.test/list/1.X");
                assert_eq!(field, "item");
            }
            _ => panic!("expected structure error"),
        }
    }

    #[test]
    fn empty_page_is_retried_when_configured() -> Result<(), ScrapeError> {
        let mut source = three_pages();
        let got: Vec<String> = walk(&mut source, location(), items)
            .empty_page_retries(2)
            .collect::<Result<_, _>>()?;
        assert_eq!(got.len(), 5);
        // page 3 fetched once plus two retries
        assert_eq!(source.fetch_count(), 5);
        Ok(())
    }
}
