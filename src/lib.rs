//! doc-crud - store CRUD generici sopra un driver a documenti, con variante auditata
//!
//! - [`driver`]: contratto del driver e implementazione MongoDB
//! - [`repositories`]: [`RecordStore`] e [`AuditedRecordStore`]
//! - [`entities`] / [`dtos`]: tipi persistiti e parametri delle richieste
//! - [`core`]: configurazione, errori, logging, stato

pub mod core;
pub mod driver;
pub mod dtos;
pub mod entities;
pub mod repositories;

// Re-export dei tipi principali per facilitare l'import
pub use crate::core::{AppState, Config, CrudError, Result, init_tracing};
pub use driver::{DocumentClient, DocumentCollection, MongoClient};
pub use dtos::{ListQuery, UpdateSpec, WriteOptions};
pub use entities::{AuditEntry, AuditOperation, IntoRecordId, Record, RecordId};
pub use repositories::{
    AuditedRecordStore, Create, Delete, Read, RecordStore, Subdocuments, TimestampFields, Update,
};
