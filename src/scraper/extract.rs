//! Field extraction from already-fetched pages: author page, author books list, quote listings,
//! book page and similar-authors page.
//!
//! Every function is pure. A missing mandatory element is a [`StructureError`]; a missing
//! optional element is `None`. A page whose item container is absent yields no items.

use crate::model::{AuthorInfo, Rating};
use crate::scraper::{parse_selector, StructureError};
use crate::text::{cap_words, clean_quote_text, parse_author_href, parse_count, parse_item_id};
use indexmap::IndexMap;
use scraper::node::Node;
use scraper::{CaseSensitivity, ElementRef, Html};

/// One row of an author's book list.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRow {
    pub id: String,
    pub name: String,
    pub edition: Option<String>,
    pub year: Option<i32>,
    pub rating: Rating,
}

/// One quote block of a quote listing.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteBlock {
    pub id: String,
    pub name: Option<String>,
    pub text: String,
    pub tags: Vec<String>,
    pub likes: u64,
    pub book: Option<BookLink>,
}

/// Book reference attached to a quote. The site links the work's quote listing, so the id is a
/// work id, not the book id of `/book/show/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookLink {
    pub work_id: String,
    pub name: String,
    pub quotes_href: String,
}

/// Author reference parsed from a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorLink {
    pub id: String,
    pub name: String,
    pub href: String,
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().has_class(class, CaseSensitivity::CaseSensitive)
}

// Author page

/// Canonical display name from the author page heading.
pub fn author_name(doc: &Html) -> Result<String, StructureError> {
    let sel = parse_selector("h1.authorName span")?;
    doc.select(&sel)
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StructureError::missing("author name"))
}

/// Long biography. `<br>` becomes a newline. Absent biography is an empty string.
pub fn author_description(doc: &Html) -> Result<String, StructureError> {
    let about_sel = parse_selector("div.aboutAuthorInfo")?;
    let span_sel = parse_selector("span")?;
    let Some(about) = doc.select(&about_sel).next() else {
        return Ok(String::new());
    };
    let Some(long) = about.select(&span_sel).last() else {
        return Ok(String::new());
    };
    let mut desc = String::new();
    for child in long.children() {
        match child.value() {
            Node::Text(t) => desc.push_str(t),
            Node::Element(e) if e.name() == "br" => desc.push('\n'),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    desc.extend(el.text());
                }
            }
            _ => {}
        }
    }
    Ok(desc.replace('\u{2019}', "'").trim().to_string())
}

/// Free-form information sections (genres, influences, website...) plus the description.
///
/// Sections start at `dataTitle` markers and run until the next marker or the biography block.
/// Unknown titles collect every link text that follows. Three titles have their own layout:
/// `Born` (the bare text right after the title), `Influences` (links of the last span in the
/// next element) and `Member Since` (text of the next element).
pub fn author_info(doc: &Html) -> Result<AuthorInfo, StructureError> {
    let container_sel = parse_selector("div.rightContainer")?;
    let start_sel = parse_selector("br.clear")?;
    let span_sel = parse_selector("span")?;
    let a_sel = parse_selector("a")?;

    let mut sections: IndexMap<String, Vec<String>> = IndexMap::new();
    let start = doc
        .select(&container_sel)
        .next()
        .and_then(|c| c.select(&start_sel).next());
    let mut key: Option<String> = None;
    let mut cursor = start.map(|s| *s);

    while let Some(node) = cursor {
        let mut last = node;
        if let Some(el) = ElementRef::wrap(node) {
            if has_class(el, "aboutAuthorInfo") {
                break;
            }
            let mut items: Vec<String> = Vec::new();
            if has_class(el, "dataTitle") {
                let title = text_of(el);
                sections.entry(title.clone()).or_default();
                match title.as_str() {
                    "Born" => {
                        if let Some(next) = node.next_sibling() {
                            last = next;
                            if let Some(t) = next.value().as_text() {
                                items.push(t.trim().to_string());
                            }
                        }
                    }
                    "Influences" => {
                        if let Some(next) = node.next_siblings().find_map(ElementRef::wrap) {
                            last = *next;
                            if let Some(span) = next.select(&span_sel).last() {
                                items.extend(span.select(&a_sel).map(text_of));
                            }
                        }
                    }
                    "Member Since" => {
                        if let Some(next) = node.next_siblings().find_map(ElementRef::wrap) {
                            last = *next;
                            items.push(text_of(next));
                        }
                    }
                    _ => items.extend(el.select(&a_sel).map(text_of)),
                }
                key = Some(title);
            } else {
                items.extend(el.select(&a_sel).map(text_of));
            }
            if let Some(k) = &key {
                if let Some(values) = sections.get_mut(k) {
                    values.extend(items.into_iter().filter(|s| !s.is_empty()));
                }
            }
        }
        cursor = last.next_sibling();
    }

    Ok(AuthorInfo {
        sections,
        description: author_description(doc)?,
    })
}

// Author books list

/// Every book row on a book-list page, in document order.
pub fn book_rows(doc: &Html) -> Result<Vec<BookRow>, StructureError> {
    let sel = parse_selector("table.tableList tr")?;
    doc.select(&sel).map(book_row).collect()
}

pub fn book_row(tr: ElementRef<'_>) -> Result<BookRow, StructureError> {
    let title_sel = parse_selector("a.bookTitle")?;
    let rating_sel = parse_selector("span.minirating")?;
    let details_sel = parse_selector("span.greyText.smallText.uitext")?;
    let edition_sel = parse_selector("a.greyText")?;

    let title = tr
        .select(&title_sel)
        .next()
        .ok_or_else(|| StructureError::missing("book title"))?;
    let href = title.value().attr("href").unwrap_or_default();
    let (id, _) = parse_item_id(href).ok_or_else(|| StructureError::unparsable("book id", href))?;
    let name = cap_words(&text_of(title));

    let rating = tr
        .select(&rating_sel)
        .next()
        .ok_or_else(|| StructureError::missing("book rating"))
        .and_then(|span| parse_rating(&text_of(span)))?;

    let details = tr.select(&details_sel).next();
    let edition = details
        .and_then(|d| d.select(&edition_sel).next())
        .map(text_of)
        .filter(|s| !s.is_empty());
    let year = details.and_then(publication_year);

    Ok(BookRow {
        id,
        name,
        edition,
        year,
        rating,
    })
}

/// `4.55 avg rating — 2,414 ratings`, possibly preceded by a star label.
pub fn parse_rating(text: &str) -> Result<Rating, StructureError> {
    let unparsable = || StructureError::unparsable("book rating", text);
    let (before, after) = text.split_once("avg rating").ok_or_else(unparsable)?;
    let average: f32 = before
        .split_whitespace()
        .last()
        .and_then(|s| s.parse().ok())
        .ok_or_else(unparsable)?;
    let count = parse_count(after, &["ratings", "rating"]).ok_or_else(unparsable)?;
    Ok(Rating { average, count })
}

/// Year from the trailing `— published 1963` text of the details span.
fn publication_year(details: ElementRef<'_>) -> Option<i32> {
    let last = details.children().last()?;
    let text = last.value().as_text()?;
    let year = parse_count(text, &["expected publication", "published"])?;
    i32::try_from(year).ok()
}

// Quote listings

/// Every quote block of a quote page, in document order.
pub fn quote_blocks(doc: &Html) -> Result<Vec<QuoteBlock>, StructureError> {
    let sel = parse_selector("div.quotes > div.quote")?;
    doc.select(&sel).map(quote_block).collect()
}

pub fn quote_block(block: ElementRef<'_>) -> Result<QuoteBlock, StructureError> {
    let (id, name, likes) = quote_likes(block)?;
    Ok(QuoteBlock {
        id,
        name,
        text: quote_text(block)?,
        tags: quote_tags(block)?,
        likes,
        book: quote_book(block)?,
    })
}

/// Quote body: direct text children of the text container, `<br>` as newline.
pub fn quote_text(block: ElementRef<'_>) -> Result<String, StructureError> {
    let sel = parse_selector("div.quoteText")?;
    let container = block
        .select(&sel)
        .next()
        .ok_or_else(|| StructureError::missing("quote text"))?;
    let mut raw = String::new();
    for child in container.children() {
        match child.value() {
            Node::Element(e) if e.name() == "br" => raw.push('\n'),
            Node::Text(t) => raw.push_str(t.trim()),
            _ => {}
        }
    }
    Ok(clean_quote_text(&raw))
}

pub fn quote_tags(block: ElementRef<'_>) -> Result<Vec<String>, StructureError> {
    let sel = parse_selector("div.greyText.smallText.left > a")?;
    Ok(block
        .select(&sel)
        .map(text_of)
        .filter(|s| !s.is_empty())
        .collect())
}

/// Likes count plus the quote id and slug carried by the likes link.
pub fn quote_likes(
    block: ElementRef<'_>,
) -> Result<(String, Option<String>, u64), StructureError> {
    let sel = parse_selector("div.quoteFooter a.smallText")?;
    let link = block
        .select(&sel)
        .next()
        .ok_or_else(|| StructureError::missing("quote likes"))?;
    let text = text_of(link);
    let likes = parse_count(&text, &["likes", "like"])
        .ok_or_else(|| StructureError::unparsable("quote likes", &text))?;
    let href = link.value().attr("href").unwrap_or_default();
    let (id, name) =
        parse_item_id(href).ok_or_else(|| StructureError::unparsable("quote id", href))?;
    Ok((id, name, likes))
}

/// Book the quote is taken from, when the listing names one.
pub fn quote_book(block: ElementRef<'_>) -> Result<Option<BookLink>, StructureError> {
    let sel = parse_selector("div.quoteText a.authorOrTitle")?;
    Ok(block.select(&sel).next().and_then(|a| {
        let href = a.value().attr("href")?;
        let (work_id, _) = parse_item_id(href)?;
        Some(BookLink {
            work_id,
            name: text_of(a),
            quotes_href: href.to_string(),
        })
    }))
}

// Book page

/// Link to the book's own quote listing, if the page has one.
pub fn book_quotes_href(doc: &Html) -> Result<Option<String>, StructureError> {
    let sel = parse_selector(r#"div.clearFloats.bigBox a[href*="/quotes/"]"#)?;
    Ok(doc
        .select(&sel)
        .last()
        .and_then(|a| a.value().attr("href"))
        .map(String::from))
}

// Similar authors page

/// Authors listed as similar. The first heading link is the author itself and is skipped.
pub fn similar_authors(doc: &Html) -> Result<Vec<AuthorLink>, StructureError> {
    let sel = parse_selector("a.gr-h3.gr-h3--serif.gr-h3--noMargin")?;
    Ok(doc
        .select(&sel)
        .skip(1)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let (id, name) = parse_author_href(href)?;
            Some(AuthorLink {
                id,
                name,
                href: href.to_string(),
            })
        })
        .collect())
}
