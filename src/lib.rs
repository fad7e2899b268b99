//! grscrape: CLI scraper for Goodreads authors, books and quotes, outputting JSON records.

pub mod api;
pub mod cli;
pub mod config;
pub mod graph;
pub mod lang;
pub mod model;
pub mod record;
pub mod scraper;
pub mod session;
pub mod text;

#[cfg(test)]
mod testing;

// Re-exports for CLI and consumers.
pub use api::GoodReads;
pub use graph::Graph;
pub use lang::{LanguageDetector, WhatlangDetector};
pub use model::{Author, AuthorInfo, AuthorKey, Book, BookKey, Quote, QuoteKey, Rating};
pub use record::{to_record, Record, ToRecord};
pub use scraper::{PageLocation, PageSource, PoliteClient, PoliteClientBuilder, ScrapeError};
pub use session::{BookField, QuoteField, Session, SessionOptions};
