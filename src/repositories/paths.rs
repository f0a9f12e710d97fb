//! Path builder for subdocument queries and assignments
//!
//! Pure functions: they never mutate their input and are idempotent on keys
//! that already carry the prefix they would add.

use bson::{Bson, Document};

/// Roots every key of an element predicate at `array_field`
///
/// `{name: "games"}` becomes `{"likes.name": "games"}`. Keys already rooted at
/// `likes.` and top-level operators (`$or`, ...) are kept as they are.
pub fn element_query(array_field: &str, query: &Document) -> Document {
    rewrite(query, &format!("{array_field}."))
}

/// Points every assignment at the element matched by the positional operator
///
/// `{name: "trouble"}` becomes `{"likes.$.name": "trouble"}`. Keys already
/// rooted at `likes.$.` are kept as they are.
pub fn positional_assignment(array_field: &str, fields: &Document) -> Document {
    rewrite(fields, &format!("{array_field}.$."))
}

/// Parent filter selecting records whose `array_field` holds an element matching `predicate`
///
/// A predicate made only of operators (`{$in: [...]}`, `{$or: [...]}`) cannot be rooted
/// key by key, so it is wrapped as `{array_field: {$elemMatch: predicate}}`.
pub fn element_match(array_field: &str, predicate: &Document) -> Document {
    let operators_only = !predicate.is_empty() && predicate.keys().all(|key| key.starts_with('$'));
    if operators_only {
        let mut elem_match = Document::new();
        elem_match.insert("$elemMatch", predicate.clone());
        single(array_field, elem_match)
    } else {
        element_query(array_field, predicate)
    }
}

fn rewrite(source: &Document, prefix: &str) -> Document {
    let mut out = Document::new();
    for (key, value) in source {
        if key.starts_with('$') || key.starts_with(prefix) {
            out.insert(key.clone(), value.clone());
        } else {
            out.insert(format!("{prefix}{key}"), value.clone());
        }
    }
    out
}

/// Merges `extra` into `base`; keys of `extra` win
pub(crate) fn merged(mut base: Document, extra: Document) -> Document {
    for (key, value) in extra {
        base.insert(key, value);
    }
    base
}

/// `{key: value}` for a key only known at runtime
pub(crate) fn single(key: &str, value: impl Into<Bson>) -> Document {
    let mut out = Document::new();
    out.insert(key, value.into());
    out
}

/// Reads a dotted path through nested subdocuments
pub(crate) fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    Some(current)
}

/// Applies an inclusion or exclusion projection to a document already in memory
///
/// Dotted keys reach into subdocuments and into the documents of an array.
/// Inclusion keeps `_id` unless it is excluded explicitly.
pub(crate) fn project(document: &Document, projection: Option<&Document>) -> Document {
    let Some(projection) = projection.filter(|p| !p.is_empty()) else {
        return document.clone();
    };
    let inclusion = projection
        .iter()
        .any(|(key, flag)| key != "_id" && included(flag));

    if inclusion {
        let mut paths: Vec<&str> = projection
            .iter()
            .filter(|(key, flag)| key.as_str() != "_id" && included(flag))
            .map(|(key, _)| key.as_str())
            .collect();
        if projection.get("_id").is_none_or(included) {
            paths.push("_id");
        }
        include(document, &paths)
    } else {
        let mut out = document.clone();
        for (path, _) in projection.iter().filter(|(_, flag)| !included(flag)) {
            exclude(&mut out, path);
        }
        out
    }
}

fn included(flag: &Bson) -> bool {
    match flag {
        Bson::Boolean(flag) => *flag,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => true,
    }
}

fn include(source: &Document, paths: &[&str]) -> Document {
    let mut out = Document::new();
    for (key, value) in source {
        if paths.contains(&key.as_str()) {
            out.insert(key.clone(), value.clone());
            continue;
        }
        let prefix = format!("{key}.");
        let nested: Vec<&str> = paths
            .iter()
            .filter_map(|path| path.strip_prefix(prefix.as_str()))
            .collect();
        if nested.is_empty() {
            continue;
        }
        match value {
            Bson::Document(inner) => {
                out.insert(key.clone(), include(inner, &nested));
            }
            Bson::Array(items) => {
                let items: Vec<Bson> = items
                    .iter()
                    .filter_map(Bson::as_document)
                    .map(|inner| Bson::Document(include(inner, &nested)))
                    .collect();
                out.insert(key.clone(), items);
            }
            _ => {}
        }
    }
    out
}

fn exclude(target: &mut Document, path: &str) {
    let Some((head, rest)) = path.split_once('.') else {
        target.remove(path);
        return;
    };
    match target.get_mut(head) {
        Some(Bson::Document(inner)) => exclude(inner, rest),
        Some(Bson::Array(items)) => {
            for item in items {
                if let Bson::Document(inner) = item {
                    exclude(inner, rest);
                }
            }
        }
        _ => {}
    }
}
