//! Deterministic string transforms: URL slugs, quote cleanup, ASCII folding, and the
//! small href/number parsers shared by the extractors.

/// Characters removed (or replaced) when turning a display name into a URL slug.
const SLUG_CHARS: [(char, &str); 10] = [
    ('-', ""),
    (' ', "_"),
    ('/', ""),
    ('.', ""),
    (',', ""),
    ('\'', ""),
    ('`', ""),
    ('&', ""),
    ('?', ""),
    ('!', ""),
];

/// Markup leftovers and typographic quotes found in quote bodies.
const HTML_ARTIFACTS: [(&str, &str); 9] = [
    ("<br/>", ""),
    ("<br>", ""),
    ("<i>", ""),
    ("</i>", ""),
    ("<b>", ""),
    ("</b>", ""),
    ("\u{201d}", ""),
    ("\u{201c}", ""),
    ("\u{2019}", "'"),
];

/// Roman numerals 2 through 29 (chapter and verse markers inside quotes).
const ROMAN_NUMERALS: [&str; 28] = [
    "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII", "XIII", "XIV", "XV",
    "XVI", "XVII", "XVIII", "XIX", "XX", "XXI", "XXII", "XXIII", "XXIV", "XXV", "XXVI", "XXVII",
    "XXVIII", "XXIX",
];

/// Uppercase the first letter of every word. A word starts at the beginning of the string or
/// after any non-alphanumeric character. Other letters are left untouched, so the transform is
/// idempotent.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

/// Capitalize each whitespace-separated word and lowercase the rest; runs of whitespace collapse
/// to a single space. Used for book titles.
pub fn cap_words(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn a display name into the token used in site URLs, e.g. `J.K. Rowling` -> `JK_Rowling`.
///
/// ASCII-folds first, then title-cases, then strips the slug punctuation set and replaces spaces
/// with underscores. `slugify(slugify(x)) == slugify(x)`.
pub fn slugify(name: &str) -> String {
    let folded = title_case(&transliterate(name));
    let mut out = String::with_capacity(folded.len());
    for c in folded.chars() {
        match SLUG_CHARS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

/// ASCII transliteration (`Dostoïevski` -> `Dostoievski`). Already-ASCII input is returned as is.
pub fn transliterate(s: &str) -> String {
    if s.is_ascii() {
        return s.to_string();
    }
    deunicode::deunicode(s)
}

/// Clean up raw quote text: drop the attribution dash, collapse blank lines, remove markup
/// artifacts and chapter numerals.
pub fn clean_quote_text(raw: &str) -> String {
    let mut text = raw.replace('\u{2015}', "").replace("\n\n", "\n");
    if text.ends_with('\n') {
        text.pop();
    }
    for (from, to) in HTML_ARTIFACTS {
        text = text.replace(from, to);
    }
    strip_roman_numerals(&text)
}

/// Remove standalone roman numerals 2..=29 (upper or lower case) from a text.
///
/// A numeral is only removed when it is a whole space-delimited token sharing its line with other
/// content, so `Chapter iv\n` becomes `Chapter\n` while `living` or a line holding a lone numeral
/// is kept. The very first and very last token of the text are never removed: only numerals
/// with a separator on both sides count.
pub fn strip_roman_numerals(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let last = lines.len() - 1;
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| strip_line_numerals(line, i == 0, i == last))
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_line_numerals(line: &str, first_line: bool, last_line: bool) -> String {
    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.len() < 2 {
        return line.to_string();
    }
    let end = tokens.len() - 1;
    tokens
        .into_iter()
        .enumerate()
        .filter(|&(j, t)| {
            (first_line && j == 0) || (last_line && j == end) || !is_roman_numeral(t)
        })
        .map(|(_, t)| t)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_roman_numeral(token: &str) -> bool {
    ROMAN_NUMERALS
        .iter()
        .any(|r| token == *r || token == r.to_ascii_lowercase())
}

/// Parse a count written with site punctuation (`2,414 ratings`, `— published 1963`).
///
/// Removes every `noise` word, thousands separators and dashes before parsing. Returns `None`
/// when nothing numeric is left.
pub fn parse_count(text: &str, noise: &[&str]) -> Option<u64> {
    let mut cleaned = text.to_string();
    for word in noise {
        cleaned = cleaned.replace(word, "");
    }
    let cleaned: String = cleaned
        .chars()
        .filter(|c| !matches!(c, ',' | '\u{2014}' | '\u{2013}') && !c.is_whitespace())
        .collect();
    cleaned.parse().ok()
}

/// Last path segment of an href, without query string or fragment.
fn last_segment(href: &str) -> &str {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// Split an author href (`/author/show/1077326.J_K_Rowling`) into id and display name.
///
/// Only `.../author/show/{id}.{Name}` links qualify; book, quote or list links give `None`.
pub fn parse_author_href(href: &str) -> Option<(String, String)> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let mut segments = path.trim_end_matches('/').rsplit('/');
    let (segment, show, author) = (segments.next()?, segments.next()?, segments.next()?);
    if author != "author" || show != "show" {
        return None;
    }
    let (id, name) = segment.split_once('.')?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((id.to_string(), title_case(&name.replace('_', " "))))
}

/// Split a book or quote href into its numeric id and optional slug.
///
/// `/book/show/6514.The_Bell_Jar` -> (`6514`, `The_Bell_Jar`),
/// `/quotes/12345-so-many-books` -> (`12345`, `so-many-books`).
pub fn parse_item_id(href: &str) -> Option<(String, Option<String>)> {
    let segment = last_segment(href);
    let end = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    if end == 0 {
        return None;
    }
    let id = segment[..end].to_string();
    let slug = segment[end..]
        .trim_start_matches(['-', '.'])
        .to_string();
    Some((id, Some(slug).filter(|s| !s.is_empty())))
}
