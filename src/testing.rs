//! Test doubles: canned page source, deterministic language detector and page builders that
//! mirror the site markup the extractors expect.

use crate::lang::LanguageDetector;
use crate::scraper::{PageSource, ScrapeError};
use scraper::Html;
use std::collections::HashMap;

pub const BASE: &str = "https://stub.test";

/// Serves canned HTML by exact URL and records every request. Unknown URLs fail with HTTP 404.
#[derive(Debug, Default)]
pub struct StubSource {
    pages: HashMap<String, String>,
    requests: Vec<String>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` at `url`, replacing any previous page.
    pub fn page(&mut self, url: &str, html: String) {
        self.pages.insert(url.to_string(), html);
    }

    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    pub fn fetch_count(&self) -> usize {
        self.requests.len()
    }

    /// Number of requests made for `url`.
    pub fn count_for(&self, url: &str) -> usize {
        self.requests.iter().filter(|r| r.as_str() == url).count()
    }
}

impl PageSource for StubSource {
    fn fetch(&mut self, url: &str) -> Result<Html, ScrapeError> {
        self.requests.push(url.to_string());
        match self.pages.get(url) {
            Some(html) => Ok(Html::parse_document(html)),
            None => Err(ScrapeError::HttpStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

/// Text starting with `FR:` is French, everything else English.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubDetector;

impl LanguageDetector for StubDetector {
    fn detect(&self, text: &str) -> Option<String> {
        if text.starts_with("FR:") {
            Some("fr".to_string())
        } else {
            Some("en".to_string())
        }
    }
}

pub fn author_page(name: &str) -> String {
    format!(
        r#"<html><body>
<div class="leftContainer"><img alt="{name}"></div>
<div class="rightContainer">
<h1 class="authorName"><span itemprop="name">{name}</span></h1>
<br class="clear"/>
<div class="dataTitle">Born</div>
in Boston, Massachusetts, The United States
<div class="clear"></div>
<div class="dataTitle">Website</div>
<div class="dataItem"><a href="http://www.sylviaplath.info/">http://www.sylviaplath.info/</a></div>
<div class="dataTitle">Genre</div>
<div class="dataItem"><a href="/genres/poetry">Poetry</a>, <a href="/genres/fiction">Fiction</a></div>
<div class="dataTitle">Influences</div>
<div class="dataItem"><span id="freeTextContainerInf">Virginia Woolf, ...</span><span id="freeTextInf" style="display:none"><a href="/author/show/6765.Virginia_Woolf">Virginia Woolf</a>, <a href="/author/show/7.Emily_Dickinson">Emily Dickinson</a></span></div>
<div class="dataTitle">Member Since</div>
<div class="dataItem">April 2010</div>
<br class="clear"/>
<div class="aboutAuthorInfo"><span id="freeTextContainer">Sylvia Plath was...</span><span id="freeText" style="display:none">Sylvia Plath was an American poet.<br>She wasn&rsquo;t only a poet.</span></div>
</div>
</body></html>"#
    )
}

/// Book list page; each row is (id, name, publication year).
pub fn book_list_page(rows: &[(&str, &str, Option<i32>)]) -> String {
    let trs: String = rows
        .iter()
        .map(|(id, name, year)| {
            let published = match year {
                Some(y) => format!("\n — published\n {}\n", y),
                None => "\n".to_string(),
            };
            format!(
                r#"<tr itemscope itemtype="http://schema.org/Book"><td>
<a class="bookTitle" href="/book/show/{id}.{slug}"><span itemprop="name">{name}</span></a>
<br><span class="by">by</span> <a class="authorName" href="/author/show/4379.Sylvia_Plath"><span itemprop="name">Sylvia Plath</span></a>
<br><div><span class="greyText smallText uitext"><span class="minirating"><span class="stars staticStars"></span> 4.05 avg rating — 2,414 ratings</span> — <a class="greyText" href="/work/editions/{id}">12 editions</a>{published}</span></div>
</td></tr>"#,
                id = id,
                slug = crate::text::slugify(name),
                name = name,
                published = published
            )
        })
        .collect();
    format!(
        r#"<html><body><table class="tableList">{}</table></body></html>"#,
        trs
    )
}

/// A quote row: (id, text, likes, optional (work id, book name)).
pub type QuoteFixture<'a> = (&'a str, &'a str, u64, Option<(&'a str, &'a str)>);

pub fn quote_page(quotes: &[QuoteFixture<'_>]) -> String {
    let divs: String = quotes
        .iter()
        .map(|(id, text, likes, book)| {
            let book_link = match book {
                Some((work_id, book_name)) => format!(
                    r#"<span id="quote_book_link_{id}"><a class="authorOrTitle" href="/work/quotes/{work_id}-{slug}">{book_name}</a></span>"#,
                    slug = book_name.to_lowercase().replace(' ', "-")
                ),
                None => String::new(),
            };
            format!(
                r#"<div class="quote mediumText"><div class="quoteDetails">
<div class="quoteText">
  &ldquo;{text}&rdquo;
  <br>  &#8213;
  <span class="authorOrTitle">Sylvia Plath,</span>
  {book_link}
</div>
<div class="quoteFooter">
<div class="greyText smallText left">tags: <a href="/quotes/tag/love">love</a>, <a href="/quotes/tag/life">life</a></div>
<div class="right"><a class="smallText" title="View this quote" href="/quotes/{id}-quote-{id}">{likes} likes</a></div>
</div></div></div>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="leftContainer"><div class="quotes">{}</div></div></body></html>"#,
        divs
    )
}

pub fn book_page(quotes_href: Option<&str>) -> String {
    let quotes_box = match quotes_href {
        Some(href) => format!(
            r#"<div class=" clearFloats bigBox"><div class="h2Container"><h2><a href="{href}">Quotes from this book</a></h2></div></div>"#
        ),
        None => String::new(),
    };
    format!(
        r#"<html><body><div class=" clearFloats bigBox"><h2><a href="/reviews">Reviews</a></h2></div>{}</body></html>"#,
        quotes_box
    )
}

/// Similar-authors page. The first link is the author itself, as on the site.
pub fn similar_page(self_href: &str, others: &[&str]) -> String {
    let links: String = std::iter::once(self_href)
        .chain(others.iter().copied())
        .map(|href| {
            format!(
                r#"<div class="listWithDividers__item"><a class="gr-h3 gr-h3--serif gr-h3--noMargin" href="{href}"><span>name</span></a></div>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", links)
}
