//! MemoryClient - document store in memoria per i test
//!
//! Implementa il contratto del driver su namespace `Vec<Document>`, con solo il
//! sottoinsieme di filtri, update e proiezioni che gli store usano. Qualsiasi altro
//! operatore fallisce con [`MemoryError::UnsupportedOperator`].

mod filter;

use bson::{Bson, Document, oid::ObjectId};
use dashmap::DashMap;
use doc_crud::driver::{
    DocumentClient, DocumentCollection, DriverResult, FindOneAndDeleteOptions,
    FindOneAndUpdateOptions, FindOptions, ReturnDocument,
};
use filter::{MatchInfo, compare_by_spec, matches};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    #[error("the positional operator did not find the match needed from the query")]
    PositionalNoMatch,

    #[error("duplicate key: _id {0}")]
    DuplicateKey(Bson),
}

type Namespace = Arc<RwLock<Vec<Document>>>;

/// Client su namespace in memoria (`<database>.<collection>`); i cloni condividono i dati
#[derive(Clone, Debug)]
pub struct MemoryClient {
    namespaces: Arc<DashMap<String, Namespace>>,
    connected: Arc<AtomicBool>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self {
            namespaces: Arc::new(DashMap::new()),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simula la caduta (o il ritorno) della connessione
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentClient for MemoryClient {
    type Collection = MemoryCollection;

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn collection(&self, database: &str, name: &str) -> MemoryCollection {
        let documents = self
            .namespaces
            .entry(format!("{database}.{name}"))
            .or_default()
            .clone();
        MemoryCollection {
            name: name.to_string(),
            documents,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MemoryCollection {
    name: String,
    documents: Namespace,
}

/// Primo documento che soddisfa `filter` nell'ordine di `sort`, con il suo indice
fn select_first(
    documents: &[Document],
    filter: &Document,
    sort: Option<&Document>,
) -> Result<Option<(usize, MatchInfo)>, MemoryError> {
    let mut selected: Option<(usize, MatchInfo)> = None;
    for (index, doc) in documents.iter().enumerate() {
        let Some(info) = matches(doc, filter)? else {
            continue;
        };
        match (sort, selected) {
            (None, None) => return Ok(Some((index, info))),
            (Some(spec), Some((best, _))) => {
                if compare_by_spec(doc, &documents[best], spec).is_lt() {
                    selected = Some((index, info));
                }
            }
            _ => selected = Some((index, info)),
        }
    }
    Ok(selected)
}

fn shape(doc: &Document, projection: Option<&Document>, positional: Option<usize>) -> Result<Document, MemoryError> {
    match projection {
        Some(projection) => projection::project(doc, projection, positional),
        None => Ok(doc.clone()),
    }
}

fn with_id(document: Document) -> Document {
    if document.contains_key("_id") {
        return document;
    }
    let mut stored = Document::new();
    stored.insert("_id", ObjectId::new());
    for (key, value) in document {
        stored.insert(key, value);
    }
    stored
}

/// Campi di uguaglianza del filtro, copiati nel documento creato da un upsert
fn seed_from_filter(filter: &Document) -> Result<Document, MemoryError> {
    let mut seed = Document::new();
    for (key, value) in filter {
        if key.starts_with('$') || filter::is_operator_document(value) {
            continue;
        }
        update::set_path(&mut seed, key, value.clone())?;
    }
    Ok(seed)
}

impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, filter: Document, options: FindOptions) -> DriverResult<Vec<Document>> {
        let documents = self.documents.read().await;
        let mut matched = Vec::new();
        for doc in documents.iter() {
            if let Some(info) = matches(doc, &filter)? {
                matched.push((doc, info));
            }
        }
        if let Some(spec) = options.sort.as_ref() {
            matched.sort_by(|(a, _), (b, _)| compare_by_spec(a, b, spec));
        }
        let skip = options.skip.unwrap_or(0) as usize;
        let limit = match options.limit {
            Some(n) if n != 0 => n.unsigned_abs() as usize,
            _ => usize::MAX,
        };

        let mut out = Vec::new();
        for (doc, info) in matched.into_iter().skip(skip).take(limit) {
            out.push(shape(doc, options.projection.as_ref(), info.positional)?);
        }
        Ok(out)
    }

    async fn count_documents(&self, filter: Document) -> DriverResult<u64> {
        let documents = self.documents.read().await;
        let mut count = 0;
        for doc in documents.iter() {
            if matches(doc, &filter)?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn insert_one(&self, document: Document) -> DriverResult<Document> {
        let stored = with_id(document);
        let mut documents = self.documents.write().await;
        if let Some(id) = stored.get("_id") {
            if documents.iter().any(|doc| doc.get("_id") == Some(id)) {
                return Err(MemoryError::DuplicateKey(id.clone()).into());
            }
        }
        documents.push(stored.clone());
        Ok(stored)
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: FindOneAndUpdateOptions,
    ) -> DriverResult<Option<Document>> {
        let mut documents = self.documents.write().await;
        match select_first(&documents, &filter, options.sort.as_ref())? {
            Some((index, info)) => {
                let before = documents[index].clone();
                let mut after = before.clone();
                update::apply_update(&mut after, &update, info.positional, false)?;
                documents[index] = after.clone();
                let image = match options.return_document {
                    ReturnDocument::Before => before,
                    ReturnDocument::After => after,
                };
                Ok(Some(shape(&image, options.projection.as_ref(), info.positional)?))
            }
            None if options.upsert => {
                let mut inserted = seed_from_filter(&filter)?;
                update::apply_update(&mut inserted, &update, None, true)?;
                let inserted = with_id(inserted);
                documents.push(inserted.clone());
                match options.return_document {
                    ReturnDocument::Before => Ok(None),
                    ReturnDocument::After => Ok(Some(shape(&inserted, options.projection.as_ref(), None)?)),
                }
            }
            None => Ok(None),
        }
    }

    async fn find_one_and_delete(
        &self,
        filter: Document,
        options: FindOneAndDeleteOptions,
    ) -> DriverResult<Option<Document>> {
        let mut documents = self.documents.write().await;
        match select_first(&documents, &filter, options.sort.as_ref())? {
            Some((index, info)) => {
                let removed = documents.remove(index);
                Ok(Some(shape(&removed, options.projection.as_ref(), info.positional)?))
            }
            None => Ok(None),
        }
    }
}
