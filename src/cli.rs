//! CLI parsing and orchestration. Parses args, builds the client and session, runs one lookup
//! and writes its records as pretty JSON. Maps errors to exit codes.

use crate::api::{GoodReads, DEFAULT_BOOKS_TOP_K, DEFAULT_QUOTES_TOP_K};
use crate::config::{self, Config};
use crate::scraper::{PoliteClient, ScrapeError, DEFAULT_BASE_URL};
use crate::session::SessionOptions;
use crate::text::parse_author_href;
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scrape(#[from] ScrapeError),

    #[error("Cannot write output {path}: {source}", path = .path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scrape(_) => 2,
            CliRunError::Output { .. } | CliRunError::Json(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "grscrape")]
#[command(about = "Scrape Goodreads authors, books and quotes as JSON records")]
#[command(
    after_help = "Config file keys (base_url, user_agent, request_delay_secs, timeout_secs, retry_count, retry_backoff_secs, verbose, empty_page_retries, ascii) are read from ./grscrape.toml or $XDG_CONFIG_HOME/grscrape/config.toml. CLI flags override config."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Write JSON here instead of stdout.
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Transliterate every string of the output to ASCII.
    #[arg(long, global = true)]
    pub ascii: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Delay before each request in seconds (overrides config; default 0).
    #[arg(long, global = true)]
    pub delay: Option<f64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Site root (overrides config).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Log each fetched page (-v), or crawl details too (-vv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Errors only.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Author name, information sections and description.
    Author {
        /// Author id (`4379`) or author URL (`/author/show/4379.Sylvia_Plath`).
        #[arg(value_parser = parse_author)]
        author: AuthorArg,
    },
    /// The author's most popular books.
    Books {
        #[arg(value_parser = parse_author)]
        author: AuthorArg,
        #[command(flatten)]
        limit: Limit,
    },
    /// The author's most popular quotes.
    Quotes {
        #[arg(value_parser = parse_author)]
        author: AuthorArg,
        #[command(flatten)]
        limit: Limit,
        /// Keep only quotes in this language (ISO 639 code, e.g. en, fr).
        #[arg(long)]
        lang: Option<String>,
    },
    /// One book of the author, with the quotes of its own quote pages.
    Book {
        #[arg(value_parser = parse_author)]
        author: AuthorArg,
        #[command(flatten)]
        book: BookArg,
        #[command(flatten)]
        limit: Limit,
        #[arg(long)]
        lang: Option<String>,
    },
    /// Quotes of one book of the author.
    BookQuotes {
        #[arg(value_parser = parse_author)]
        author: AuthorArg,
        #[command(flatten)]
        book: BookArg,
        #[command(flatten)]
        limit: Limit,
        #[arg(long)]
        lang: Option<String>,
    },
    /// Authors the site lists as similar.
    Similar {
        #[arg(value_parser = parse_author)]
        author: AuthorArg,
        #[command(flatten)]
        limit: Limit,
    },
    /// Free-text search (not supported).
    Query { query: String },
}

/// Author given on the command line. A URL also carries the name, which saves a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorArg {
    pub id: String,
    pub name: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct BookArg {
    /// Book id, or title with --by-name.
    pub book: String,

    /// Match the book by title instead of id.
    #[arg(long)]
    pub by_name: bool,
}

#[derive(ClapArgs, Debug, Clone, Copy)]
pub struct Limit {
    /// Number of items to return (ordered by popularity).
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Return every item; crawls the whole list.
    #[arg(long, conflicts_with = "top_k")]
    pub all: bool,
}

impl Limit {
    fn resolve(self, default: usize) -> Option<usize> {
        if self.all {
            None
        } else {
            Some(self.top_k.unwrap_or(default))
        }
    }
}

fn parse_author(s: &str) -> Result<AuthorArg, String> {
    let s = s.trim();
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        return Ok(AuthorArg {
            id: s.to_string(),
            name: None,
        });
    }
    match parse_author_href(s) {
        Some((id, name)) => Ok(AuthorArg {
            id,
            name: Some(name).filter(|n| !n.is_empty()),
        }),
        _ => Err(format!(
            "Expected an author id (e.g. 4379) or author URL (e.g. https://www.goodreads.com/author/show/4379.Sylvia_Plath), got '{}'",
            s
        )),
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the level picked from the flags.
pub fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("warn"),
                1 => EnvFilter::new("grscrape=info,warn"),
                _ => EnvFilter::new("grscrape=debug,info"),
            }
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Ensure output path parent exists; return path.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

fn build_client(args: &Args, config: Option<&Config>) -> Result<PoliteClient, CliRunError> {
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    let delay_secs = args
        .delay
        .or_else(|| config.and_then(|c| c.request_delay_secs))
        .unwrap_or(0.0);
    let timeout_secs = args
        .timeout
        .or_else(|| config.and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let verbose = args.verbose > 0 || config.and_then(|c| c.verbose).unwrap_or(false);
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.and_then(|c| c.user_agent.clone()));

    let mut builder = PoliteClient::builder()
        .delay_secs(delay_secs)
        .timeout_secs(timeout_secs)
        .verbose(verbose);
    if let Some(n) = config.and_then(|c| c.retry_count) {
        builder = builder.retry_count(n);
    }
    if let Some(backoff) = config.and_then(|c| c.retry_backoff_secs.clone()) {
        builder = builder.retry_backoff_secs(backoff);
    }
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

fn session_options(args: &Args, config: Option<&Config>) -> SessionOptions {
    SessionOptions {
        base_url: args
            .base_url
            .clone()
            .or_else(|| config.and_then(|c| c.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        empty_page_retries: config.and_then(|c| c.empty_page_retries).unwrap_or(0),
    }
}

/// Run one command against `gr` and return its JSON output.
fn execute<S, D>(gr: &mut GoodReads<S, D>, command: &Command) -> Result<Value, CliRunError>
where
    S: crate::scraper::PageSource,
    D: crate::lang::LanguageDetector,
{
    let value = match command {
        Command::Author { author } => {
            let id = register(gr, author);
            Value::Object(gr.get_author(&id)?)
        }
        Command::Books { author, limit } => {
            let id = register(gr, author);
            records(gr.get_books(&id, limit.resolve(DEFAULT_BOOKS_TOP_K))?)
        }
        Command::Quotes {
            author,
            limit,
            lang,
        } => {
            let id = register(gr, author);
            records(gr.get_quotes(
                &id,
                limit.resolve(DEFAULT_QUOTES_TOP_K),
                lang.as_deref(),
            )?)
        }
        Command::Book {
            author,
            book,
            limit,
            lang,
        } => {
            let id = register(gr, author);
            match gr.get_book(
                &id,
                &book.book,
                book.by_name,
                limit.resolve(DEFAULT_QUOTES_TOP_K),
                lang.as_deref(),
            )? {
                Some(record) => Value::Object(record),
                None => return Err(book_not_found(&id, book)),
            }
        }
        Command::BookQuotes {
            author,
            book,
            limit,
            lang,
        } => {
            let id = register(gr, author);
            match gr.get_book_quotes(
                &id,
                &book.book,
                book.by_name,
                limit.resolve(DEFAULT_QUOTES_TOP_K),
                lang.as_deref(),
            )? {
                Some(quotes) => records(quotes),
                None => return Err(book_not_found(&id, book)),
            }
        }
        Command::Similar { author, limit } => {
            let id = register(gr, author);
            records(gr.get_similar(&id, limit.resolve(DEFAULT_BOOKS_TOP_K))?)
        }
        Command::Query { query } => {
            gr.search_query(query)?;
            Value::Null
        }
    };
    Ok(value)
}

/// Register the author (with its name when the argument was a URL) and return its id.
fn register<S, D>(gr: &mut GoodReads<S, D>, author: &AuthorArg) -> String
where
    S: crate::scraper::PageSource,
    D: crate::lang::LanguageDetector,
{
    gr.session_mut().author(&author.id, author.name.as_deref());
    author.id.clone()
}

fn records(records: Vec<crate::record::Record>) -> Value {
    Value::Array(records.into_iter().map(Value::Object).collect())
}

fn book_not_found(author_id: &str, book: &BookArg) -> CliRunError {
    let by = if book.by_name { "titled" } else { "with id" };
    CliRunError::InvalidInput(format!(
        "Author {} has no book {} '{}'",
        author_id, by, book.book
    ))
}

fn write_output(value: &Value, output: Option<&Path>) -> Result<(), CliRunError> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n").map_err(|source| CliRunError::Output {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json).map_err(|source| CliRunError::Output {
                path: PathBuf::from("<stdout>"),
                source,
            })?;
        }
    }
    Ok(())
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let config = config.as_ref();

    let config_verbose = config.and_then(|c| c.verbose).unwrap_or(false);
    setup_logging(args.verbose.max(u8::from(config_verbose)), args.quiet);

    if let Some(path) = &args.output {
        validate_output_path(path)?;
    }

    let client = build_client(args, config)?;
    let ascii = args.ascii || config.and_then(|c| c.ascii).unwrap_or(false);
    let mut gr = GoodReads::new(client, session_options(args, config)).ascii(ascii);

    let value = execute(&mut gr, &args.command)?;
    write_output(&value, args.output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::testing::{book_list_page, StubDetector, StubSource, BASE};

    fn facade(source: StubSource) -> GoodReads<StubSource, StubDetector> {
        let options = SessionOptions {
            base_url: BASE.to_string(),
            empty_page_retries: 0,
        };
        GoodReads::from_session(Session::with_detector(source, StubDetector, options))
    }

    #[test]
    fn parse_author_accepts_id_and_url() {
        assert_eq!(
            parse_author("4379").unwrap(),
            AuthorArg {
                id: "4379".to_string(),
                name: None
            }
        );
        assert_eq!(
            parse_author("https://www.goodreads.com/author/show/4379.Sylvia_Plath").unwrap(),
            AuthorArg {
                id: "4379".to_string(),
                name: Some("Sylvia Plath".to_string())
            }
        );
    }

    #[test]
    fn parse_author_rejects_names() {
        assert!(parse_author("Sylvia Plath").is_err());
        assert!(parse_author("").is_err());
        assert!(parse_author("/book/show/6514.The_Bell_Jar.x").is_err());
        assert!(parse_author("https://www.goodreads.com/book/show/6514.The_Bell_Jar").is_err());
    }

    #[test]
    fn args_parse_subcommands_and_global_flags() {
        let args = Args::try_parse_from([
            "grscrape", "quotes", "4379", "--top-k", "5", "--lang", "fr", "--ascii", "-vv",
        ])
        .unwrap();
        assert!(args.ascii);
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Quotes { author, limit, lang } => {
                assert_eq!(author.id, "4379");
                assert_eq!(limit.resolve(DEFAULT_QUOTES_TOP_K), Some(5));
                assert_eq!(lang.as_deref(), Some("fr"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn limit_defaults_and_all() {
        let args = Args::try_parse_from(["grscrape", "books", "4379"]).unwrap();
        let Command::Books { limit, .. } = args.command else {
            panic!("expected books");
        };
        assert_eq!(limit.resolve(DEFAULT_BOOKS_TOP_K), Some(DEFAULT_BOOKS_TOP_K));
        let args = Args::try_parse_from(["grscrape", "books", "4379", "--all"]).unwrap();
        let Command::Books { limit, .. } = args.command else {
            panic!("expected books");
        };
        assert_eq!(limit.resolve(DEFAULT_BOOKS_TOP_K), None);
        assert!(Args::try_parse_from(["grscrape", "books", "4379", "--all", "--top-k", "3"]).is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["grscrape", "-q", "-v", "author", "4379"]).is_err());
    }

    #[test]
    fn execute_books_with_named_author_skips_name_lookup() {
        let mut source = StubSource::new();
        source.page(
            "https://stub.test/author/list/4379.Sylvia_Plath",
            book_list_page(&[("6514", "The Bell Jar", Some(1963))]),
        );
        let mut gr = facade(source);
        let args = Args::try_parse_from([
            "grscrape",
            "books",
            "/author/show/4379.Sylvia_Plath",
            "--top-k",
            "1",
        ])
        .unwrap();
        let value = execute(&mut gr, &args.command).unwrap();
        assert_eq!(value[0]["book"], "The Bell Jar");
        assert_eq!(value[0]["author"], "Sylvia Plath");
        assert_eq!(gr.session().source().fetch_count(), 1);
    }

    #[test]
    fn missing_book_is_invalid_input() {
        let mut source = StubSource::new();
        source.page(
            "https://stub.test/author/list/4379.Sylvia_Plath",
            book_list_page(&[("6514", "The Bell Jar", Some(1963))]),
        );
        source.page(
            "https://stub.test/author/list/4379.Sylvia_Plath?page=2",
            book_list_page(&[]),
        );
        let mut gr = facade(source);
        let args = Args::try_parse_from([
            "grscrape",
            "book",
            "/author/show/4379.Sylvia_Plath",
            "999",
        ])
        .unwrap();
        let err = execute(&mut gr, &args.command).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("999"));
    }

    #[test]
    fn query_is_a_scrape_error() {
        let mut gr = facade(StubSource::new());
        let args = Args::try_parse_from(["grscrape", "query", "bell jar"]).unwrap();
        let err = execute(&mut gr, &args.command).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_output(&serde_json::json!({"author": "Sylvia Plath"}), Some(&path)).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n  \"author\": \"Sylvia Plath\"\n}\n");
    }

    #[test]
    fn validate_output_path_parent_missing() {
        let path = PathBuf::from("/nonexistent_dir_grscrape_xyz/out.json");
        let result = validate_output_path(&path);
        assert!(matches!(result, Err(CliRunError::InvalidInput(msg)) if msg.contains("parent directory does not exist")));
    }

    #[test]
    fn cli_run_error_exit_codes() {
        assert_eq!(CliRunError::InvalidInput("x".into()).exit_code(), 1);
        assert_eq!(
            CliRunError::Scrape(ScrapeError::Unsupported { operation: "x" }).exit_code(),
            2
        );
        assert_eq!(
            CliRunError::Output {
                path: PathBuf::from("x"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "x"),
            }
            .exit_code(),
            3
        );
    }
}
