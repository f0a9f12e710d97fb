#![allow(dead_code)]

pub mod memory;

pub use memory::{MemoryClient, MemoryCollection, MemoryError};

use bson::{Bson, Document, doc, oid::ObjectId};
use doc_crud::driver::{
    DocumentClient, DocumentCollection, DriverResult, FindOneAndDeleteOptions,
    FindOneAndUpdateOptions, FindOptions,
};
use doc_crud::{AuditedRecordStore, RecordStore, WriteOptions};
use std::sync::Arc;

pub const DATABASE: &str = "test";
pub const PETS: &str = "pets";

/// Inizializza il logging per i test (idempotente)
pub fn init_logging() {
    doc_crud::init_tracing("debug");
}

/// Crea un client in memoria e uno store senza audit sulla collection `pets`
pub fn create_test_store() -> (Arc<MemoryClient>, RecordStore<MemoryClient>) {
    init_logging();
    let client = Arc::new(MemoryClient::new());
    let store = RecordStore::new(client.clone(), DATABASE, PETS);
    (client, store)
}

/// Crea uno store con audit sulla collection `pets`
///
/// # Returns
/// Il client (per ispezionare la collection di audit) e lo store
pub fn create_audited_store() -> (Arc<MemoryClient>, AuditedRecordStore<MemoryClient>) {
    let (client, store) = create_test_store();
    (client, AuditedRecordStore::new(store))
}

/// Store senza audit sulla collection di audit, per leggerne il contenuto grezzo
pub fn raw_audit_store(client: &Arc<MemoryClient>) -> RecordStore<MemoryClient> {
    RecordStore::new(client.clone(), DATABASE, "audit")
}

/// Record di riferimento: Blacky con due subdocument in `likes`
///
/// # Returns
/// `(record, games_id, music_id)` dove `record` include il proprio `_id`
pub fn blacky() -> (Document, ObjectId, ObjectId) {
    let games = ObjectId::new();
    let music = ObjectId::new();
    let record = doc! {
        "_id": ObjectId::new(),
        "name": "Blacky",
        "likes": [
            { "_id": games, "name": "games" },
            { "_id": music, "name": "music" },
        ],
    };
    (record, games, music)
}

/// Scrive `record` direttamente con il driver, senza timestamp né audit
pub async fn seed(client: &MemoryClient, collection: &str, record: Document) -> Document {
    client
        .collection(DATABASE, collection)
        .insert_one(record)
        .await
        .expect("seed insert")
}

pub fn anonymous() -> WriteOptions {
    WriteOptions::new()
}

pub fn likes(record: &Document) -> Vec<Bson> {
    record.get_array("likes").cloned().unwrap_or_default()
}

// ****** CLIENT CON AUDIT NON SCRIVIBILE ****** //

#[derive(Debug, thiserror::Error)]
#[error("audit collection is read-only")]
pub struct ReadOnlyAudit;

/// Client che delega a [`MemoryClient`] ma rifiuta ogni insert sulla collection di audit
#[derive(Clone, Default)]
pub struct ReadOnlyAuditClient {
    pub inner: MemoryClient,
}

pub struct MaybeReadOnly {
    inner: MemoryCollection,
    read_only: bool,
}

impl DocumentClient for ReadOnlyAuditClient {
    type Collection = MaybeReadOnly;

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn collection(&self, database: &str, name: &str) -> Self::Collection {
        MaybeReadOnly {
            inner: self.inner.collection(database, name),
            read_only: name == "audit",
        }
    }
}

impl DocumentCollection for MaybeReadOnly {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn find(&self, filter: Document, options: FindOptions) -> DriverResult<Vec<Document>> {
        self.inner.find(filter, options).await
    }

    async fn count_documents(&self, filter: Document) -> DriverResult<u64> {
        self.inner.count_documents(filter).await
    }

    async fn insert_one(&self, document: Document) -> DriverResult<Document> {
        if self.read_only {
            return Err(Box::new(ReadOnlyAudit));
        }
        self.inner.insert_one(document).await
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: FindOneAndUpdateOptions,
    ) -> DriverResult<Option<Document>> {
        self.inner.find_one_and_update(filter, update, options).await
    }

    async fn find_one_and_delete(
        &self,
        filter: Document,
        options: FindOneAndDeleteOptions,
    ) -> DriverResult<Option<Document>> {
        self.inner.find_one_and_delete(filter, options).await
    }
}
