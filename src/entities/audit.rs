//! AuditEntry entity - una entry per ogni scrittura andata a buon fine

use super::AuditOperation;
use bson::{Document, oid::ObjectId};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Actor recorded when the caller does not name one
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Persisted layout of one audit entry
///
/// `old` is absent for CREATE, `new` is absent for REMOVE, UPDATE carries both.
/// Use the constructors to keep that shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuditEntry {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub collection: String,
    pub operation: AuditOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<Document>,
    pub user: String,
    pub timestamp: bson::DateTime,
}

impl AuditEntry {
    fn new(
        collection: &str,
        operation: AuditOperation,
        old: Option<Document>,
        new: Option<Document>,
        user: &str,
    ) -> Self {
        Self {
            id: None,
            collection: collection.to_string(),
            operation,
            old,
            new,
            user: user.to_string(),
            timestamp: bson::DateTime::from_chrono(Utc::now()),
        }
    }

    pub fn created(collection: &str, record: Document, user: &str) -> Self {
        Self::new(collection, AuditOperation::Create, None, Some(record), user)
    }

    pub fn updated(collection: &str, old: Document, new: Document, user: &str) -> Self {
        Self::new(collection, AuditOperation::Update, Some(old), Some(new), user)
    }

    pub fn removed(collection: &str, record: Document, user: &str) -> Self {
        Self::new(collection, AuditOperation::Remove, Some(record), None, user)
    }
}
