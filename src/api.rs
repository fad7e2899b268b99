//! Convenience facade: look things up by site id and get records back.

use crate::lang::{LanguageDetector, WhatlangDetector};
use crate::model::{AuthorKey, BookKey, QuoteKey};
use crate::record::{to_record, Record};
use crate::scraper::{PageSource, PoliteClient, ScrapeError};
use crate::session::{BookField, Session, SessionOptions};

/// Number of books returned when no limit is given.
pub const DEFAULT_BOOKS_TOP_K: usize = 10;
/// Number of quotes returned when no limit is given.
pub const DEFAULT_QUOTES_TOP_K: usize = 50;

/// Wraps a [`Session`]; every lookup is keyed by author id and every `get_*` renders records,
/// transliterated to ASCII when the facade is set to.
pub struct GoodReads<S = PoliteClient, D = WhatlangDetector> {
    session: Session<S, D>,
    ascii: bool,
}

impl GoodReads {
    pub fn new(client: PoliteClient, options: SessionOptions) -> Self {
        Self::from_session(Session::new(client).options(options))
    }
}

impl<S: PageSource, D: LanguageDetector> GoodReads<S, D> {
    pub fn from_session(session: Session<S, D>) -> Self {
        Self {
            session,
            ascii: false,
        }
    }

    /// Fold every string of the returned records to ASCII.
    pub fn ascii(mut self, ascii: bool) -> Self {
        self.ascii = ascii;
        self
    }

    pub fn session(&self) -> &Session<S, D> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<S, D> {
        &mut self.session
    }

    /// Author handle; nothing is fetched until its data is needed.
    pub fn search_author(&mut self, author_id: &str) -> AuthorKey {
        self.session.author(author_id, None)
    }

    /// Book of an author, by book id or, when `by_name` is set, by title.
    pub fn search_book(
        &mut self,
        author_id: &str,
        book: &str,
        by_name: bool,
    ) -> Result<Option<BookKey>, ScrapeError> {
        let author = self.search_author(author_id);
        let by = if by_name { BookField::Name } else { BookField::Id };
        self.session.search_book(author, book, by, true)
    }

    pub fn search_books(
        &mut self,
        author_id: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<BookKey>, ScrapeError> {
        let author = self.search_author(author_id);
        self.session.get_books(author, top_k, true)
    }

    pub fn search_quotes(
        &mut self,
        author_id: &str,
        top_k: Option<usize>,
        lang: Option<&str>,
    ) -> Result<Vec<QuoteKey>, ScrapeError> {
        let author = self.search_author(author_id);
        self.session.get_quotes(author, top_k, lang, true)
    }

    /// Free-text search is not available.
    pub fn search_query(&mut self, query: &str) -> Result<Vec<AuthorKey>, ScrapeError> {
        self.session.search_query(query)
    }

    /// Author record: name, information sections and description.
    pub fn get_author(&mut self, author_id: &str) -> Result<Record, ScrapeError> {
        let author = self.search_author(author_id);
        self.session.author_info(author)?;
        Ok(self.author_record(author))
    }

    pub fn get_books(
        &mut self,
        author_id: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<Record>, ScrapeError> {
        let books = self.search_books(author_id, top_k)?;
        Ok(books.into_iter().map(|b| self.book_record(b)).collect())
    }

    pub fn get_quotes(
        &mut self,
        author_id: &str,
        top_k: Option<usize>,
        lang: Option<&str>,
    ) -> Result<Vec<Record>, ScrapeError> {
        let quotes = self.search_quotes(author_id, top_k, lang)?;
        Ok(quotes.into_iter().map(|q| self.quote_record(q)).collect())
    }

    /// Book record with the first `top_k` quotes of the book's quote pages, or `None` when the
    /// author has no such book.
    pub fn get_book(
        &mut self,
        author_id: &str,
        book: &str,
        by_name: bool,
        top_k: Option<usize>,
        lang: Option<&str>,
    ) -> Result<Option<Record>, ScrapeError> {
        let Some(book) = self.search_book(author_id, book, by_name)? else {
            return Ok(None);
        };
        self.session.get_book_quotes(book, top_k, lang, true)?;
        Ok(Some(self.book_record(book)))
    }

    pub fn get_book_quotes(
        &mut self,
        author_id: &str,
        book: &str,
        by_name: bool,
        top_k: Option<usize>,
        lang: Option<&str>,
    ) -> Result<Option<Vec<Record>>, ScrapeError> {
        let Some(book) = self.search_book(author_id, book, by_name)? else {
            return Ok(None);
        };
        let quotes = self.session.get_book_quotes(book, top_k, lang, true)?;
        Ok(Some(
            quotes.into_iter().map(|q| self.quote_record(q)).collect(),
        ))
    }

    /// Records of similar authors. Only their names are known; no author page is fetched.
    pub fn get_similar(
        &mut self,
        author_id: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<Record>, ScrapeError> {
        let author = self.search_author(author_id);
        let similar = self.session.get_similar(author, top_k)?;
        Ok(similar.into_iter().map(|a| self.author_record(a)).collect())
    }

    pub fn author_record(&self, author: AuthorKey) -> Record {
        let graph = self.session.graph();
        to_record(graph.author(author), graph, self.ascii)
    }

    pub fn book_record(&self, book: BookKey) -> Record {
        let graph = self.session.graph();
        to_record(graph.book(book), graph, self.ascii)
    }

    pub fn quote_record(&self, quote: QuoteKey) -> Record {
        let graph = self.session.graph();
        to_record(graph.quote(quote), graph, self.ascii)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        author_page, book_list_page, book_page, quote_page, StubDetector, StubSource, BASE,
    };
    use serde_json::json;

    fn facade(source: StubSource) -> GoodReads<StubSource, StubDetector> {
        let options = SessionOptions {
            base_url: BASE.to_string(),
            empty_page_retries: 0,
        };
        GoodReads::from_session(Session::with_detector(source, StubDetector, options))
    }

    fn site() -> StubSource {
        let mut source = StubSource::new();
        source.page("https://stub.test/author/show/4379", author_page("Sylvia Plath"));
        source.page(
            "https://stub.test/author/list/4379.Sylvia_Plath",
            book_list_page(&[("6514", "The Bell Jar", Some(1963)), ("395090", "Ariel", None)]),
        );
        source.page(
            "https://stub.test/author/list/4379.Sylvia_Plath?page=2",
            book_list_page(&[]),
        );
        source.page(
            "https://stub.test/author/quotes/4379.Sylvia_Plath",
            quote_page(&[("1", "Je suis, je suis.", 9, Some(("1385044", "The Bell Jar")))]),
        );
        source.page(
            "https://stub.test/author/quotes/4379.Sylvia_Plath?page=2",
            quote_page(&[]),
        );
        source.page(
            "https://stub.test/book/show/6514.The_Bell_Jar",
            book_page(Some("/work/quotes/1385044-the-bell-jar")),
        );
        source.page(
            "https://stub.test/work/quotes/1385044-the-bell-jar",
            quote_page(&[("2", "I am, I am, I am.", 42, Some(("1385044", "The Bell Jar")))]),
        );
        source.page(
            "https://stub.test/work/quotes/1385044-the-bell-jar?page=2",
            quote_page(&[]),
        );
        source
    }

    #[test]
    fn get_author_renders_info_record() -> Result<(), ScrapeError> {
        let mut gr = facade(site());
        let record = gr.get_author("4379")?;
        assert_eq!(record["author"], json!("Sylvia Plath"));
        assert_eq!(record["Genre"], json!(["Poetry", "Fiction"]));
        assert_eq!(record.keys().last().map(String::as_str), Some("Description"));
        Ok(())
    }

    #[test]
    fn get_books_and_book_quotes() -> Result<(), ScrapeError> {
        let mut gr = facade(site());
        let books = gr.get_books("4379", None)?;
        assert_eq!(books.len(), 2);
        assert_eq!(books[0]["book"], json!("The Bell Jar"));
        assert_eq!(books[1]["year"], json!(null));

        let book = gr.get_book("4379", "The Bell Jar", true, None, None)?;
        let book = book.expect("book found");
        assert_eq!(book["quotes"][0]["quote"], json!("I am, I am, I am."));
        assert_eq!(book["quotes"][0]["likes"], json!(42));

        assert!(gr.get_book("4379", "404", false, None, None)?.is_none());
        Ok(())
    }

    #[test]
    fn ascii_facade_folds_strings() -> Result<(), ScrapeError> {
        let mut gr = facade(site()).ascii(true);
        gr.session_mut().author("4379", Some("Sylvia Pláth"));
        let quotes = gr.get_quotes("4379", None, None)?;
        assert_eq!(quotes[0]["author"], json!("Sylvia Plath"));
        Ok(())
    }

    #[test]
    fn search_query_is_unsupported() {
        let mut gr = facade(site());
        assert!(matches!(
            gr.search_query("bell jar"),
            Err(ScrapeError::Unsupported { .. })
        ));
    }
}
