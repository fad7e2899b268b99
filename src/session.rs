//! Crawl orchestration over the entity graph.
//!
//! A [`Session`] owns the graph, the page source and the language detector. Every author and
//! book keeps ordered caches of what earlier crawls discovered. A request that the cache cannot
//! satisfy clears it and crawls again from page 1: asking for more items than were fetched before
//! always costs a full re-crawl, never an incremental "fetch more pages".

use crate::graph::Graph;
use crate::lang::{self, LanguageDetector, WhatlangDetector};
use crate::model::{AuthorInfo, AuthorKey, BookKey, EntityCache, QuoteKey};
use crate::scraper::extract;
use crate::scraper::paginate::walk;
use crate::scraper::{PageLocation, PageSource, ScrapeError, StructureError, DEFAULT_BASE_URL};
use crate::text::parse_author_href;
use tracing::debug;

/// Per-session crawl settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Site root every path is resolved against.
    pub base_url: String,
    /// How many times an empty listing page is fetched again before it ends the listing.
    pub empty_page_retries: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            empty_page_retries: 0,
        }
    }
}

/// Field compared by [`Session::search_book`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookField {
    Id,
    Name,
}

/// Field compared by [`Session::search_quote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteField {
    Id,
    Name,
    Text,
}

/// Owner of a quote cache.
#[derive(Debug, Clone, Copy)]
enum QuoteOwner {
    Author(AuthorKey),
    Book(BookKey),
}

pub struct Session<S, D = WhatlangDetector> {
    graph: Graph,
    source: S,
    detector: D,
    options: SessionOptions,
}

impl<S: PageSource> Session<S> {
    /// Session against the live site with the default language detector.
    pub fn new(source: S) -> Self {
        Self::with_detector(source, WhatlangDetector, SessionOptions::default())
    }
}

impl<S: PageSource, D: LanguageDetector> Session<S, D> {
    pub fn with_detector(source: S, detector: D, options: SessionOptions) -> Self {
        Self {
            graph: Graph::new(),
            source,
            detector,
            options,
        }
    }

    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    // Authors

    /// Register an author. No request is made; the name is resolved lazily when needed.
    pub fn author(&mut self, id: &str, name: Option<&str>) -> AuthorKey {
        self.graph.insert_author(id, name)
    }

    /// Register the author behind a `/author/show/{id}.{Name}` link.
    pub fn author_from_href(&mut self, href: &str) -> Result<AuthorKey, ScrapeError> {
        let (id, name) = parse_author_href(href).ok_or_else(|| ScrapeError::InvalidUrl {
            input: href.to_string(),
            reason: "expected /author/show/{id}.{name}".to_string(),
        })?;
        Ok(self.graph.insert_author(&id, Some(&name)))
    }

    /// Display name of an author, fetching the author page once if it is still unknown.
    pub fn author_name(&mut self, author: AuthorKey) -> Result<String, ScrapeError> {
        if let Some(name) = self.graph.author(author).name() {
            return Ok(name.to_string());
        }
        let url = self.author_page(author).url();
        self.load_author_page(author)?;
        self.graph
            .author(author)
            .name()
            .map(String::from)
            .ok_or_else(|| StructureError::missing("author name").at(&url))
    }

    /// Information sections and description of the author page, fetched once per author.
    pub fn author_info(&mut self, author: AuthorKey) -> Result<AuthorInfo, ScrapeError> {
        match self.graph.author(author).info() {
            Some(info) => Ok(info.clone()),
            None => self.load_author_page(author),
        }
    }

    fn author_page(&self, author: AuthorKey) -> PageLocation {
        let a = self.graph.author(author);
        match a.name() {
            Some(name) => PageLocation::author_show(&self.options.base_url, a.id(), name),
            None => PageLocation::author_show_by_id(&self.options.base_url, a.id()),
        }
    }

    /// Fetch the author page and keep everything it tells: the name (if unknown) and the info.
    fn load_author_page(&mut self, author: AuthorKey) -> Result<AuthorInfo, ScrapeError> {
        let url = self.author_page(author).url();
        let doc = self.source.fetch(&url)?;
        if self.graph.author(author).name().is_none() {
            let name = extract::author_name(&doc).map_err(|e| e.at(&url))?;
            self.graph.author_mut(author).resolve_name(&name);
        }
        let info = extract::author_info(&doc).map_err(|e| e.at(&url))?;
        self.graph.author_mut(author).info = Some(info.clone());
        Ok(info)
    }

    fn author_ident(&mut self, author: AuthorKey) -> Result<(String, String), ScrapeError> {
        let name = self.author_name(author)?;
        Ok((self.graph.author(author).id().to_string(), name))
    }

    // Books

    /// The author's first `top_k` books (all of them when `None`) in site order.
    pub fn get_books(
        &mut self,
        author: AuthorKey,
        top_k: Option<usize>,
        use_cache: bool,
    ) -> Result<Vec<BookKey>, ScrapeError> {
        if top_k == Some(0) {
            return Ok(Vec::new());
        }
        let cache = self.graph.author(author).books();
        if use_cache && satisfies(cache, top_k) {
            debug!(
                "Serving {} cached books of author {}",
                cache.len(),
                author_label(&self.graph, author)
            );
            return Ok(first(cache.keys(), top_k));
        }
        self.crawl_books(author, |_, found| top_k.is_some_and(|k| found.len() >= k))
    }

    /// First book of the author whose `by` field equals `query`, or `None`.
    pub fn search_book(
        &mut self,
        author: AuthorKey,
        query: &str,
        by: BookField,
        use_cache: bool,
    ) -> Result<Option<BookKey>, ScrapeError> {
        let is_match = |graph: &Graph, key: BookKey| {
            let book = graph.book(key);
            match by {
                BookField::Id => book.id() == query,
                BookField::Name => book.name() == query,
            }
        };
        let cache = self.graph.author(author).books();
        if use_cache {
            if let Some(key) = cache.keys().iter().copied().find(|&k| is_match(&self.graph, k)) {
                return Ok(Some(key));
            }
            if cache.is_complete() {
                return Ok(None);
            }
        }
        let found = self.crawl_books(author, |graph, found| {
            found.last().is_some_and(|&k| is_match(graph, k))
        })?;
        Ok(found.into_iter().find(|&k| is_match(&self.graph, k)))
    }

    /// Clear the author's book cache and walk the book list from page 1 until `stop` says so or
    /// the list ends. Books found before a failure stay cached.
    fn crawl_books(
        &mut self,
        author: AuthorKey,
        mut stop: impl FnMut(&Graph, &[BookKey]) -> bool,
    ) -> Result<Vec<BookKey>, ScrapeError> {
        let (id, name) = self.author_ident(author)?;
        let location = PageLocation::author_books(&self.options.base_url, &id, &name);
        debug!("Crawling books of {} from {}", name, location.url());
        self.graph.author_mut(author).books.clear();

        let Self {
            graph,
            source,
            options,
            ..
        } = self;
        let pages = walk(source, location, extract::book_rows)
            .empty_page_retries(options.empty_page_retries);
        let mut found = Vec::new();
        for row in pages {
            let book = graph.upsert_book(author, &row?);
            graph.add_book(author, book);
            if !found.contains(&book) {
                found.push(book);
            }
            if stop(graph, &found) {
                return Ok(found);
            }
        }
        graph.author_mut(author).books.mark_complete();
        debug!("Book list of {} complete: {} books", name, found.len());
        Ok(found)
    }

    // Quotes

    /// The author's first `top_k` quotes in site order, keeping only quotes detected as `lang`
    /// when given. `top_k` counts matching quotes, so a filtered request may scan the whole list.
    pub fn get_quotes(
        &mut self,
        author: AuthorKey,
        top_k: Option<usize>,
        lang: Option<&str>,
        use_cache: bool,
    ) -> Result<Vec<QuoteKey>, ScrapeError> {
        if top_k == Some(0) {
            return Ok(Vec::new());
        }
        if use_cache {
            if let Some(hits) = self.cached_quotes(QuoteOwner::Author(author), top_k, lang) {
                return Ok(hits);
            }
        }
        let (id, name) = self.author_ident(author)?;
        let location = PageLocation::author_quotes(&self.options.base_url, &id, &name);
        self.crawl_quotes(QuoteOwner::Author(author), location, lang, |_, found| {
            top_k.is_some_and(|k| found.len() >= k)
        })
    }

    /// Quotes listed on a book's own quote pages, with the same cache and filter rules as
    /// [`get_quotes`](Self::get_quotes). A book page without a quotes link has no quotes.
    pub fn get_book_quotes(
        &mut self,
        book: BookKey,
        top_k: Option<usize>,
        lang: Option<&str>,
        use_cache: bool,
    ) -> Result<Vec<QuoteKey>, ScrapeError> {
        if top_k == Some(0) {
            return Ok(Vec::new());
        }
        if use_cache {
            if let Some(hits) = self.cached_quotes(QuoteOwner::Book(book), top_k, lang) {
                return Ok(hits);
            }
        }
        let href = match self.graph.book(book).quotes_href() {
            Some(href) => href.to_string(),
            None => {
                let b = self.graph.book(book);
                let url = PageLocation::book_show(&self.options.base_url, b.id(), b.name()).url();
                let doc = self.source.fetch(&url)?;
                let href = extract::book_quotes_href(&doc).map_err(|e| e.at(&url))?;
                let Some(href) = href else {
                    debug!("No quotes link on {}", url);
                    let cache = &mut self.graph.book_mut(book).quotes;
                    cache.clear();
                    cache.mark_complete();
                    return Ok(Vec::new());
                };
                self.graph.book_mut(book).quotes_href = Some(href.clone());
                href
            }
        };
        let location = PageLocation::from_href(&self.options.base_url, &href)?;
        self.crawl_quotes(QuoteOwner::Book(book), location, lang, |_, found| {
            top_k.is_some_and(|k| found.len() >= k)
        })
    }

    /// First quote of the author whose `by` field equals `query`, or `None`.
    pub fn search_quote(
        &mut self,
        author: AuthorKey,
        query: &str,
        by: QuoteField,
        use_cache: bool,
    ) -> Result<Option<QuoteKey>, ScrapeError> {
        let is_match = |graph: &Graph, key: QuoteKey| {
            let quote = graph.quote(key);
            match by {
                QuoteField::Id => quote.id() == query,
                QuoteField::Name => quote.name() == Some(query),
                QuoteField::Text => quote.text() == query,
            }
        };
        let cache = self.graph.author(author).quotes();
        if use_cache {
            if let Some(key) = cache.keys().iter().copied().find(|&k| is_match(&self.graph, k)) {
                return Ok(Some(key));
            }
            if cache.is_complete() {
                return Ok(None);
            }
        }
        let (id, name) = self.author_ident(author)?;
        let location = PageLocation::author_quotes(&self.options.base_url, &id, &name);
        let found = self.crawl_quotes(QuoteOwner::Author(author), location, None, |graph, found| {
            found.last().is_some_and(|&k| is_match(graph, k))
        })?;
        Ok(found.into_iter().find(|&k| is_match(&self.graph, k)))
    }

    /// Cached answer for a quote request, or `None` when the cache cannot answer it.
    fn cached_quotes(
        &self,
        owner: QuoteOwner,
        top_k: Option<usize>,
        lang: Option<&str>,
    ) -> Option<Vec<QuoteKey>> {
        let cache = quote_cache(&self.graph, owner);
        if !satisfies(cache, top_k) {
            return None;
        }
        let hits: Vec<QuoteKey> = cache
            .keys()
            .iter()
            .copied()
            .filter(|&k| self.language_matches(self.graph.quote(k).text(), lang))
            .take(top_k.unwrap_or(usize::MAX))
            .collect();
        let enough = top_k.map_or(true, |k| hits.len() >= k);
        if enough || cache.is_complete() {
            debug!("Serving {} cached quotes", hits.len());
            return Some(hits);
        }
        debug!(
            "Only {} cached quotes match {:?}, crawling again",
            hits.len(),
            lang
        );
        None
    }

    /// Clear the owner's quote cache and walk `location` from page 1, linking every quote found,
    /// until `stop` says so or the list ends. Only quotes in `lang` are returned, but every quote
    /// seen is cached.
    ///
    /// Quotes of an author listing that name a book are also linked to that book, which is
    /// looked up by id and created (and added to the author's books) when first seen.
    fn crawl_quotes(
        &mut self,
        owner: QuoteOwner,
        location: PageLocation,
        lang: Option<&str>,
        mut stop: impl FnMut(&Graph, &[QuoteKey]) -> bool,
    ) -> Result<Vec<QuoteKey>, ScrapeError> {
        debug!("Crawling quotes from {}", location.url());
        quote_cache_mut(&mut self.graph, owner).clear();

        let Self {
            graph,
            source,
            detector,
            options,
        } = self;
        let pages = walk(source, location, extract::quote_blocks)
            .empty_page_retries(options.empty_page_retries);
        let mut found = Vec::new();
        for block in pages {
            let block = block?;
            match owner {
                QuoteOwner::Author(author) => {
                    let quote = graph.upsert_quote(author, &block);
                    if let Some(link) = &block.book {
                        let book = graph.upsert_linked_book(author, link);
                        graph.add_book(author, book);
                        graph.add_book_quote(book, quote);
                    }
                    graph.add_quote(author, quote);
                    keep(&*detector, graph, &mut found, quote, lang);
                }
                QuoteOwner::Book(book) => {
                    let author = graph.book(book).author();
                    let quote = graph.upsert_quote(author, &block);
                    graph.add_book_quote(book, quote);
                    keep(&*detector, graph, &mut found, quote, lang);
                }
            }
            if stop(graph, &found) {
                return Ok(found);
            }
        }
        quote_cache_mut(graph, owner).mark_complete();
        debug!("Quote list complete: {} matching quotes", found.len());
        Ok(found)
    }

    fn language_matches(&self, text: &str, lang: Option<&str>) -> bool {
        language_matches(&self.detector, text, lang)
    }

    // Similar authors

    /// Authors the site lists as similar, as stubs built from their links. Only the similar
    /// page itself is fetched; the stubs fetch nothing until their own data is requested.
    pub fn get_similar(
        &mut self,
        author: AuthorKey,
        top_k: Option<usize>,
    ) -> Result<Vec<AuthorKey>, ScrapeError> {
        let (id, name) = self.author_ident(author)?;
        let url = PageLocation::author_similar(&self.options.base_url, &id, &name).url();
        let doc = self.source.fetch(&url)?;
        let links = extract::similar_authors(&doc).map_err(|e| e.at(&url))?;
        Ok(links
            .iter()
            .take(top_k.unwrap_or(usize::MAX))
            .map(|link| self.graph.insert_author(&link.id, Some(&link.name)))
            .collect())
    }

    /// Free-text search over the whole site.
    pub fn search_query(&mut self, _query: &str) -> Result<Vec<AuthorKey>, ScrapeError> {
        Err(ScrapeError::Unsupported {
            operation: "free-text query search",
        })
    }
}

/// Whether a cache can answer a request without crawling: `top_k` items when a limit is given,
/// or a finished crawl when all items are wanted.
fn satisfies<K: Copy + PartialEq>(cache: &EntityCache<K>, top_k: Option<usize>) -> bool {
    match top_k {
        Some(k) => cache.len() >= k,
        None => cache.is_complete(),
    }
}

fn first<K: Copy>(keys: &[K], top_k: Option<usize>) -> Vec<K> {
    keys.iter()
        .take(top_k.unwrap_or(usize::MAX))
        .copied()
        .collect()
}

fn language_matches<D: LanguageDetector>(detector: &D, text: &str, lang: Option<&str>) -> bool {
    match lang {
        None => true,
        Some(wanted) => detector
            .detect(text)
            .is_some_and(|detected| lang::matches(&detected, wanted)),
    }
}

fn keep<D: LanguageDetector>(
    detector: &D,
    graph: &Graph,
    found: &mut Vec<QuoteKey>,
    quote: QuoteKey,
    lang: Option<&str>,
) {
    if !found.contains(&quote) && language_matches(detector, graph.quote(quote).text(), lang) {
        found.push(quote);
    }
}

fn quote_cache(graph: &Graph, owner: QuoteOwner) -> &EntityCache<QuoteKey> {
    match owner {
        QuoteOwner::Author(author) => graph.author(author).quotes(),
        QuoteOwner::Book(book) => graph.book(book).quotes(),
    }
}

fn quote_cache_mut(graph: &mut Graph, owner: QuoteOwner) -> &mut EntityCache<QuoteKey> {
    match owner {
        QuoteOwner::Author(author) => &mut graph.author_mut(author).quotes,
        QuoteOwner::Book(book) => &mut graph.book_mut(book).quotes,
    }
}

fn author_label(graph: &Graph, author: AuthorKey) -> String {
    graph.author(author).to_string()
}
