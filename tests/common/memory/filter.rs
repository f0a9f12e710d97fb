//! Valutazione dei filtri
//!
//! I path puntati attraversano gli array di subdocument: `likes.name` corrisponde se un
//! elemento qualsiasi di `likes` ha quel `name`. L'indice dell'elemento che ha soddisfatto
//! la condizione viene conservato per l'operatore posizionale (`likes.$.name`).

use super::MemoryError;
use bson::{Bson, Document};
use std::cmp::Ordering;

#[derive(Debug, Default, Clone, Copy)]
pub struct MatchInfo {
    /// Indice dell'elemento di array che ha soddisfatto il filtro
    pub positional: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    value: Option<&'a Bson>,
    index: Option<usize>,
}

pub fn matches(doc: &Document, filter: &Document) -> Result<Option<MatchInfo>, MemoryError> {
    let mut positional = None;
    for (path, condition) in filter {
        if path.starts_with('$') {
            return Err(MemoryError::UnsupportedOperator(path.clone()));
        }
        if !match_path(doc, path, condition, &mut positional)? {
            return Ok(None);
        }
    }
    Ok(Some(MatchInfo { positional }))
}

/// Documento composto solo da operatori (`{"$gt": 1}`), non un valore letterale
pub fn is_operator_document(value: &Bson) -> bool {
    match value {
        Bson::Document(d) => !d.is_empty() && d.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

fn resolve<'a>(doc: &'a Document, path: &str) -> Vec<Candidate<'a>> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    walk(doc.get(segments[0]), &segments[1..], None, &mut out);
    out
}

fn walk<'a>(value: Option<&'a Bson>, rest: &[&str], index: Option<usize>, out: &mut Vec<Candidate<'a>>) {
    let Some((head, tail)) = rest.split_first() else {
        out.push(Candidate { value, index });
        return;
    };
    match value {
        Some(Bson::Document(d)) => walk(d.get(*head), tail, index, out),
        Some(Bson::Array(items)) => {
            let before = out.len();
            for (i, item) in items.iter().enumerate() {
                if let Bson::Document(d) = item {
                    walk(d.get(*head), tail, index.or(Some(i)), out);
                }
            }
            if out.len() == before {
                out.push(Candidate { value: None, index });
            }
        }
        _ => out.push(Candidate { value: None, index }),
    }
}

fn match_path(
    doc: &Document,
    path: &str,
    condition: &Bson,
    positional: &mut Option<usize>,
) -> Result<bool, MemoryError> {
    let candidates = resolve(doc, path);
    match condition {
        Bson::Document(operators) if is_operator_document(condition) => {
            for (op, arg) in operators {
                let matched = match op.as_str() {
                    "$elemMatch" => elem_match(&candidates, arg, positional)?,
                    "$ne" => !any_candidate(&candidates, &mut None, |v| test_operator(v, "$eq", arg))?,
                    _ => any_candidate(&candidates, positional, |v| test_operator(v, op, arg))?,
                };
                if !matched {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        literal => any_candidate(&candidates, positional, |v| test_operator(v, "$eq", literal)),
    }
}

fn elem_match(candidates: &[Candidate<'_>], arg: &Bson, positional: &mut Option<usize>) -> Result<bool, MemoryError> {
    let Bson::Document(query) = arg else {
        return Err(MemoryError::InvalidFilter("$elemMatch expects a document".into()));
    };
    for candidate in candidates {
        if let Some(Bson::Array(items)) = candidate.value {
            for (i, item) in items.iter().enumerate() {
                if element_matches(item, query)? {
                    record(positional, candidate.index.or(Some(i)));
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

/// Un singolo elemento di array contro un filtro di subdocument (`{name: "games"}`)
/// o un documento di operatori (`{"$in": [...]}`)
pub fn element_matches(element: &Bson, query: &Document) -> Result<bool, MemoryError> {
    if query.keys().all(|k| k.starts_with('$')) {
        for (op, arg) in query {
            if !test_operator(Some(element), op, arg)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }
    match element {
        Bson::Document(d) => Ok(matches(d, query)?.is_some()),
        _ => Ok(false),
    }
}

fn any_candidate<F>(candidates: &[Candidate<'_>], positional: &mut Option<usize>, mut test: F) -> Result<bool, MemoryError>
where
    F: FnMut(Option<&Bson>) -> Result<bool, MemoryError>,
{
    for candidate in candidates {
        if test(candidate.value)? {
            record(positional, candidate.index);
            return Ok(true);
        }
        if let Some(Bson::Array(items)) = candidate.value {
            for (i, item) in items.iter().enumerate() {
                if test(Some(item))? {
                    record(positional, candidate.index.or(Some(i)));
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

fn record(positional: &mut Option<usize>, index: Option<usize>) {
    if index.is_some() {
        *positional = index;
    }
}

pub fn test_operator(value: Option<&Bson>, op: &str, arg: &Bson) -> Result<bool, MemoryError> {
    let ordering = || value.and_then(|v| compare(v, arg));
    let result = match op {
        "$eq" => match value {
            Some(v) => values_equal(v, arg),
            None => matches!(arg, Bson::Null),
        },
        "$ne" => !test_operator(value, "$eq", arg)?,
        "$gt" => ordering() == Some(Ordering::Greater),
        "$gte" => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        "$lt" => ordering() == Some(Ordering::Less),
        "$lte" => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        "$in" => {
            let Bson::Array(options) = arg else {
                return Err(MemoryError::InvalidFilter("$in expects an array".into()));
            };
            options.iter().any(|option| value.is_some_and(|v| values_equal(v, option)))
        }
        other => return Err(MemoryError::UnsupportedOperator(other.to_string())),
    };
    Ok(result)
}

pub fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Uguaglianza con i numeri confrontati tra larghezze diverse
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        _ => None,
    }
}

/// Ordina due documenti secondo `{campo: 1 | -1}`; i valori mancanti vengono prima
pub fn compare_by_spec(a: &Document, b: &Document, spec: &Document) -> Ordering {
    for (path, direction) in spec {
        let left = resolve(a, path).into_iter().find_map(|c| c.value);
        let right = resolve(b, path).into_iter().find_map(|c| c.value);
        let mut ordering = match (left, right) {
            (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if as_f64(direction).is_some_and(|d| d < 0.0) {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

pub fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        other => as_f64(other).is_none_or(|n| n != 0.0),
    }
}
