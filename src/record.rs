//! Plain nested records (JSON objects) for authors, books and quotes.

use crate::graph::Graph;
use crate::model::{Author, Book, Quote};
use crate::text::transliterate;
use serde_json::{Map, Value};

/// Ordered string-keyed mapping, ready for `serde_json` output.
pub type Record = Map<String, Value>;

/// Entities that render to a [`Record`]. Cross references are read through the graph.
pub trait ToRecord {
    fn to_record(&self, graph: &Graph) -> Record;
}

/// Render `entity`, folding every string (keys included) to ASCII when `ascii` is set.
pub fn to_record<T: ToRecord + ?Sized>(entity: &T, graph: &Graph, ascii: bool) -> Record {
    let record = entity.to_record(graph);
    if ascii {
        transliterate_record(record)
    } else {
        record
    }
}

/// `{author, <info sections>..., Description}`. Sections are empty until the author page was
/// loaded.
impl ToRecord for Author {
    fn to_record(&self, _graph: &Graph) -> Record {
        let mut record = Record::new();
        record.insert(
            "author".to_string(),
            Value::from(self.name().unwrap_or_default()),
        );
        if let Some(info) = self.info() {
            for (title, values) in &info.sections {
                record.insert(title.clone(), Value::from(values.clone()));
            }
            record.insert(
                "Description".to_string(),
                Value::from(info.description.clone()),
            );
        }
        record
    }
}

/// `{author, book, edition, year, quotes}` with the quotes discovered for the book so far.
impl ToRecord for Book {
    fn to_record(&self, graph: &Graph) -> Record {
        let quotes: Vec<Value> = self
            .quotes()
            .keys()
            .iter()
            .map(|&q| Value::Object(graph.quote(q).to_record(graph)))
            .collect();
        let mut record = Record::new();
        record.insert("author".to_string(), Value::from(self.author_name()));
        record.insert("book".to_string(), Value::from(self.name()));
        record.insert("edition".to_string(), Value::from(self.edition()));
        record.insert("year".to_string(), Value::from(self.year()));
        record.insert("quotes".to_string(), Value::Array(quotes));
        record
    }
}

/// `{author, book, likes, tags, quote}`.
impl ToRecord for Quote {
    fn to_record(&self, _graph: &Graph) -> Record {
        let mut record = Record::new();
        record.insert("author".to_string(), Value::from(self.author_name()));
        record.insert("book".to_string(), Value::from(self.book_name()));
        record.insert("likes".to_string(), Value::from(self.likes()));
        record.insert("tags".to_string(), Value::from(self.tags().to_vec()));
        record.insert("quote".to_string(), Value::from(self.text()));
        record
    }
}

pub fn transliterate_record(record: Record) -> Record {
    record
        .into_iter()
        .map(|(k, v)| (transliterate(&k), transliterate_value(v)))
        .collect()
}

/// ASCII-fold every string inside `value`. Structure, numbers, booleans and nulls are kept.
pub fn transliterate_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(transliterate(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(transliterate_value).collect()),
        Value::Object(map) => Value::Object(transliterate_record(map)),
        other => other,
    }
}
