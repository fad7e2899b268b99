//! Entities of the in-memory graph: authors, books and quotes.
//!
//! Entities never own each other. The [`Graph`](crate::graph::Graph) owns every entity and hands
//! out copyable keys; cross references (book -> author, quote -> book/author) are keys, and the
//! per-entity caches are ordered lists of keys.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of an [`Author`] inside a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuthorKey(pub(crate) usize);

/// Handle of a [`Book`] inside a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookKey(pub(crate) usize);

/// Handle of a [`Quote`] inside a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuoteKey(pub(crate) usize);

/// Average rating and number of ratings of a book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub average: f32,
    pub count: u64,
}

/// Free-form author page sections plus the long description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    /// Section title -> values, in page order.
    pub sections: IndexMap<String, Vec<String>>,
    #[serde(rename = "Description")]
    pub description: String,
}

/// Ordered list of discovered children, in site order, with no key appearing twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCache<K> {
    items: Vec<K>,
    complete: bool,
}

impl<K> Default for EntityCache<K> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            complete: false,
        }
    }
}

impl<K: Copy + PartialEq> EntityCache<K> {
    pub fn keys(&self) -> &[K] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the last crawl that filled this cache reached the end of the list.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn contains(&self, key: K) -> bool {
        self.items.contains(&key)
    }

    pub(crate) fn push(&mut self, key: K) {
        if !self.contains(key) {
            self.items.push(key);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.complete = false;
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }
}

/// Normalize a display name: underscores from URL slugs become spaces, words are capitalized.
pub fn display_name(name: &str) -> String {
    crate::text::title_case(name.replace('_', " ").trim())
}

#[derive(Debug, Clone)]
pub struct Author {
    id: String,
    name: Option<String>,
    pub(crate) books: EntityCache<BookKey>,
    pub(crate) quotes: EntityCache<QuoteKey>,
    pub(crate) info: Option<AuthorInfo>,
}

impl Author {
    pub(crate) fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(display_name).filter(|n| !n.is_empty()),
            books: EntityCache::default(),
            quotes: EntityCache::default(),
            info: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, once known. Stubs created from a bare id have none until resolved.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set the name if it is still unknown. Returns false (and changes nothing) when a name was
    /// already resolved.
    pub(crate) fn resolve_name(&mut self, name: &str) -> bool {
        if self.name.is_some() {
            return false;
        }
        let name = display_name(name);
        if name.is_empty() {
            return false;
        }
        self.name = Some(name);
        true
    }

    pub fn books(&self) -> &EntityCache<BookKey> {
        &self.books
    }

    pub fn quotes(&self) -> &EntityCache<QuoteKey> {
        &self.quotes
    }

    pub fn info(&self) -> Option<&AuthorInfo> {
        self.info.as_ref()
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Author: {}", self.name().unwrap_or(&self.id))
    }
}

#[derive(Debug, Clone)]
pub struct Book {
    pub(crate) id: String,
    pub(crate) work_id: Option<String>,
    pub(crate) quotes_href: Option<String>,
    pub(crate) listed: bool,
    pub(crate) name: String,
    pub(crate) edition: Option<String>,
    pub(crate) year: Option<i32>,
    pub(crate) rating: Option<Rating>,
    pub(crate) author: AuthorKey,
    pub(crate) author_id: String,
    pub(crate) author_name: String,
    pub(crate) quotes: EntityCache<QuoteKey>,
}

impl Book {
    pub(crate) fn new(id: impl Into<String>, name: &str, author: AuthorKey) -> Self {
        let name = crate::text::cap_words(name);
        Self {
            id: id.into(),
            work_id: None,
            quotes_href: None,
            listed: false,
            name: if name.is_empty() {
                "Unknown".to_string()
            } else {
                name
            },
            edition: None,
            year: None,
            rating: None,
            author,
            author_id: String::new(),
            author_name: String::new(),
            quotes: EntityCache::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Work id, known once a quote listing linked the book.
    pub fn work_id(&self) -> Option<&str> {
        self.work_id.as_deref()
    }

    /// Site path of the book's quote listing, once known.
    pub fn quotes_href(&self) -> Option<&str> {
        self.quotes_href.as_deref()
    }

    /// Whether the book appeared in the author's book list. Books only seen through a quote
    /// carry their work id as `id` until then.
    pub fn is_listed(&self) -> bool {
        self.listed
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn edition(&self) -> Option<&str> {
        self.edition.as_deref()
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn rating(&self) -> Option<Rating> {
        self.rating
    }

    /// Owning author (relation only).
    pub fn author(&self) -> AuthorKey {
        self.author
    }

    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn quotes(&self) -> &EntityCache<QuoteKey> {
        &self.quotes
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: \"{}\"", self.author_name, self.name)?;
        if let Some(edition) = &self.edition {
            write!(f, ", {}", edition)?;
        }
        if let Some(year) = self.year {
            write!(f, " ({})", year)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Quote {
    id: String,
    pub(crate) name: Option<String>,
    text: String,
    pub(crate) tags: Vec<String>,
    pub(crate) likes: u64,
    pub(crate) author: AuthorKey,
    pub(crate) author_id: String,
    pub(crate) author_name: String,
    pub(crate) book: Option<BookKey>,
    pub(crate) book_name: Option<String>,
}

impl Quote {
    pub(crate) fn new(id: impl Into<String>, text: impl Into<String>, author: AuthorKey) -> Self {
        Self {
            id: id.into(),
            name: None,
            text: text.into(),
            tags: Vec::new(),
            likes: 0,
            author,
            author_id: String::new(),
            author_name: String::new(),
            book: None,
            book_name: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Slug following the id in the quote URL.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn likes(&self) -> u64 {
        self.likes
    }

    pub fn author(&self) -> AuthorKey {
        self.author
    }

    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn book(&self) -> Option<BookKey> {
        self.book
    }

    pub fn book_name(&self) -> Option<&str> {
        self.book_name.as_deref()
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\u{201c}{}\u{201d}\n\u{2015} {}", self.text, self.author_name)?;
        if let Some(book) = &self.book_name {
            write!(f, ", from \"{}\"", book)?;
        }
        write!(f, "\n  Likes: {}", self.likes)?;
        if !self.tags.is_empty() {
            write!(f, ", Tags: {}", self.tags.join(", "))?;
        }
        Ok(())
    }
}
