//! Record entity - documenti persistiti e normalizzazione degli identificativi

use crate::core::{CrudError, Result};
use bson::{Bson, Document, doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single persisted document
///
/// Values returned by the stores are independent copies, never live references.
pub type Record = Document;

/// Store-native record identifier
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RecordId(ObjectId);

impl RecordId {
    /// Fresh identifier, used for pushed subdocuments
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }

    /// `{_id: <id>}`
    pub fn filter(&self) -> Document {
        doc! { "_id": self.0 }
    }

    fn parse_hex(value: &str) -> Result<Self> {
        ObjectId::parse_str(value.trim())
            .map(Self)
            .map_err(|_| CrudError::invalid_argument(format!("'{value}' is not a valid record id")))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectId> for RecordId {
    fn from(value: ObjectId) -> Self {
        Self(value)
    }
}

impl From<RecordId> for Bson {
    fn from(value: RecordId) -> Self {
        Bson::ObjectId(value.0)
    }
}

impl FromStr for RecordId {
    type Err = CrudError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_hex(s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

/// Anything a caller may hand in as a record identifier
///
/// Normalisation is idempotent: a [`RecordId`] converts to itself, and a valid
/// hex string converts to the same id as its native `ObjectId`.
pub trait IntoRecordId {
    fn into_record_id(self) -> Result<RecordId>;
}

impl IntoRecordId for RecordId {
    fn into_record_id(self) -> Result<RecordId> {
        Ok(self)
    }
}

impl IntoRecordId for &RecordId {
    fn into_record_id(self) -> Result<RecordId> {
        Ok(*self)
    }
}

impl IntoRecordId for ObjectId {
    fn into_record_id(self) -> Result<RecordId> {
        Ok(RecordId(self))
    }
}

impl IntoRecordId for &ObjectId {
    fn into_record_id(self) -> Result<RecordId> {
        Ok(RecordId(*self))
    }
}

impl IntoRecordId for &str {
    fn into_record_id(self) -> Result<RecordId> {
        RecordId::parse_hex(self)
    }
}

impl IntoRecordId for String {
    fn into_record_id(self) -> Result<RecordId> {
        RecordId::parse_hex(&self)
    }
}

impl IntoRecordId for &String {
    fn into_record_id(self) -> Result<RecordId> {
        RecordId::parse_hex(self)
    }
}

impl IntoRecordId for &Bson {
    fn into_record_id(self) -> Result<RecordId> {
        match self {
            Bson::ObjectId(oid) => Ok(RecordId(*oid)),
            Bson::String(s) => RecordId::parse_hex(s),
            // extended JSON: {"$oid": "..."}
            Bson::Document(d) => match d.get_str("$oid") {
                Ok(hex) if d.len() == 1 => RecordId::parse_hex(hex),
                _ => Err(CrudError::invalid_argument(format!("{d} is not a valid record id"))),
            },
            other => Err(CrudError::invalid_argument(format!(
                "{other} is not a valid record id"
            ))),
        }
    }
}

impl IntoRecordId for Bson {
    fn into_record_id(self) -> Result<RecordId> {
        (&self).into_record_id()
    }
}

impl IntoRecordId for &serde_json::Value {
    fn into_record_id(self) -> Result<RecordId> {
        match self {
            serde_json::Value::String(s) => RecordId::parse_hex(s),
            serde_json::Value::Object(map) => match map.get("$oid") {
                Some(serde_json::Value::String(hex)) if map.len() == 1 => RecordId::parse_hex(hex),
                _ => Err(CrudError::invalid_argument(format!("{self} is not a valid record id"))),
            },
            other => Err(CrudError::invalid_argument(format!(
                "{other} is not a valid record id"
            ))),
        }
    }
}

impl IntoRecordId for serde_json::Value {
    fn into_record_id(self) -> Result<RecordId> {
        (&self).into_record_id()
    }
}
