//! Arena owning every author, book and quote discovered in a session.
//!
//! Entities are deduplicated by site id: discovering an id a second time resolves to the same
//! key. Linking primitives keep the denormalized author/book fields and the back references
//! consistent.

use crate::model::{Author, AuthorKey, Book, BookKey, Quote, QuoteKey};
use crate::scraper::extract::{BookLink, BookRow, QuoteBlock};
use crate::text::cap_words;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Graph {
    authors: Vec<Author>,
    books: Vec<Book>,
    quotes: Vec<Quote>,
    author_ids: HashMap<String, AuthorKey>,
    book_ids: HashMap<String, BookKey>,
    work_ids: HashMap<String, BookKey>,
    quote_ids: HashMap<String, QuoteKey>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // Keys are only minted by this graph, so indexing cannot fail for keys it returned.

    pub fn author(&self, key: AuthorKey) -> &Author {
        &self.authors[key.0]
    }

    pub fn book(&self, key: BookKey) -> &Book {
        &self.books[key.0]
    }

    pub fn quote(&self, key: QuoteKey) -> &Quote {
        &self.quotes[key.0]
    }

    pub(crate) fn author_mut(&mut self, key: AuthorKey) -> &mut Author {
        &mut self.authors[key.0]
    }

    pub(crate) fn book_mut(&mut self, key: BookKey) -> &mut Book {
        &mut self.books[key.0]
    }

    pub fn find_author(&self, id: &str) -> Option<AuthorKey> {
        self.author_ids.get(id).copied()
    }

    pub fn find_book(&self, id: &str) -> Option<BookKey> {
        self.book_ids.get(id).copied()
    }

    pub fn find_book_by_work(&self, work_id: &str) -> Option<BookKey> {
        self.work_ids.get(work_id).copied()
    }

    pub fn find_quote(&self, id: &str) -> Option<QuoteKey> {
        self.quote_ids.get(id).copied()
    }

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.len()
    }

    /// Register an author by id. An existing author is returned as is, except that a still
    /// unknown name is filled from `name`.
    pub fn insert_author(&mut self, id: &str, name: Option<&str>) -> AuthorKey {
        if let Some(key) = self.find_author(id) {
            if let Some(name) = name {
                self.authors[key.0].resolve_name(name);
            }
            return key;
        }
        let key = AuthorKey(self.authors.len());
        self.authors.push(Author::new(id, name));
        self.author_ids.insert(id.to_string(), key);
        key
    }

    /// Create or refresh a book from a book-list row. Fields the row carries replace the stored
    /// ones; the name of an existing book is kept.
    ///
    /// A book of the same author and name that so far was only seen through a quote link takes
    /// the row's id.
    pub fn upsert_book(&mut self, author: AuthorKey, row: &BookRow) -> BookKey {
        let key = match self.find_book(&row.id) {
            Some(key) => key,
            None => match self.unlisted_book_named(author, &row.name) {
                Some(key) => {
                    self.books[key.0].id = row.id.clone();
                    self.book_ids.insert(row.id.clone(), key);
                    key
                }
                None => {
                    let key = self.push_book(Book::new(row.id.as_str(), &row.name, author));
                    self.book_ids.insert(row.id.clone(), key);
                    key
                }
            },
        };
        let book = &mut self.books[key.0];
        book.listed = true;
        if row.edition.is_some() {
            book.edition = row.edition.clone();
        }
        if row.year.is_some() {
            book.year = row.year;
        }
        book.rating = Some(row.rating);
        key
    }

    /// Book referenced from a quote listing. The link carries a work id, so the book is looked up
    /// by work id, then by name among the author's books, and created (keyed by its work id until
    /// the book list names it) otherwise. The link's quote listing is recorded on the book.
    pub fn upsert_linked_book(&mut self, author: AuthorKey, link: &BookLink) -> BookKey {
        let key = match self.find_book_by_work(&link.work_id) {
            Some(key) => key,
            None => {
                let key = match self.book_named(author, &link.name, |b| b.work_id.is_none()) {
                    Some(key) => key,
                    None => self.push_book(Book::new(link.work_id.as_str(), &link.name, author)),
                };
                self.books[key.0].work_id = Some(link.work_id.clone());
                self.work_ids.insert(link.work_id.clone(), key);
                key
            }
        };
        let book = &mut self.books[key.0];
        if book.quotes_href.is_none() {
            book.quotes_href = Some(link.quotes_href.clone());
        }
        key
    }

    fn push_book(&mut self, book: Book) -> BookKey {
        let key = BookKey(self.books.len());
        self.books.push(book);
        key
    }

    fn unlisted_book_named(&self, author: AuthorKey, name: &str) -> Option<BookKey> {
        self.book_named(author, name, |b| !b.listed)
    }

    fn book_named(
        &self,
        author: AuthorKey,
        name: &str,
        pred: impl Fn(&Book) -> bool,
    ) -> Option<BookKey> {
        let name = cap_words(name);
        self.books
            .iter()
            .position(|b| b.author == author && b.name == name && pred(b))
            .map(BookKey)
    }

    /// Create a quote, or refresh likes, tags and name of a known one. Text is never rewritten.
    pub fn upsert_quote(&mut self, author: AuthorKey, block: &QuoteBlock) -> QuoteKey {
        let key = match self.find_quote(&block.id) {
            Some(key) => key,
            None => {
                let key = QuoteKey(self.quotes.len());
                self.quotes
                    .push(Quote::new(block.id.clone(), block.text.clone(), author));
                self.quote_ids.insert(block.id.clone(), key);
                key
            }
        };
        let quote = &mut self.quotes[key.0];
        quote.likes = block.likes;
        quote.tags = block.tags.clone();
        if block.name.is_some() {
            quote.name = block.name.clone();
        }
        key
    }

    /// Append a book to an author's cache and point the book back at the author.
    pub fn add_book(&mut self, author: AuthorKey, book: BookKey) {
        let (author_id, author_name) = self.author_fields(author);
        let b = &mut self.books[book.0];
        b.author = author;
        b.author_id = author_id;
        b.author_name = author_name;
        self.authors[author.0].books.push(book);
    }

    /// Append a quote to an author's cache and point the quote back at the author.
    pub fn add_quote(&mut self, author: AuthorKey, quote: QuoteKey) {
        let (author_id, author_name) = self.author_fields(author);
        let q = &mut self.quotes[quote.0];
        q.author = author;
        q.author_id = author_id;
        q.author_name = author_name;
        self.authors[author.0].quotes.push(quote);
    }

    /// Append a quote to a book's cache. The quote points at the book and, through the book's
    /// own link, at its author.
    pub fn add_book_quote(&mut self, book: BookKey, quote: QuoteKey) {
        let b = &self.books[book.0];
        let (author, author_id, author_name, book_name) = (
            b.author,
            b.author_id.clone(),
            b.author_name.clone(),
            b.name.clone(),
        );
        let q = &mut self.quotes[quote.0];
        q.book = Some(book);
        q.book_name = Some(book_name);
        q.author = author;
        q.author_id = author_id;
        q.author_name = author_name;
        self.books[book.0].quotes.push(quote);
    }

    fn author_fields(&self, author: AuthorKey) -> (String, String) {
        let a = &self.authors[author.0];
        (a.id().to_string(), a.name().unwrap_or_default().to_string())
    }
}
