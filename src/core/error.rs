use crate::driver::DriverError;
use crate::entities::AuditOperation;
use thiserror::Error;

/// Errors raised by the stores
///
/// "Not found" is never an error: reads and writes return `None` (or an empty
/// `Vec`) when the targeted record does not exist.
#[derive(Debug, Error)]
pub enum CrudError {
    /// The connection was not live when the operation started
    #[error("not connected to {database}.{collection}")]
    NotConnected { database: String, collection: String },

    /// A required argument was missing or malformed; raised before any I/O
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Error raised by the driver, passed through untouched
    #[error(transparent)]
    Store(#[from] DriverError),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The data mutation committed but recording its audit entry failed
    #[error("{operation} committed but its audit entry could not be written: {source}")]
    AuditWrite {
        operation: AuditOperation,
        #[source]
        source: DriverError,
    },
}

impl CrudError {
    // Common error constructors
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_connected(database: &str, collection: &str) -> Self {
        Self::NotConnected {
            database: database.to_string(),
            collection: collection.to_string(),
        }
    }

    /// Whether the caller can recover by re-establishing the connection and retrying
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected { .. })
    }
}

impl From<validator::ValidationErrors> for CrudError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<bson::ser::Error> for CrudError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bson::de::Error> for CrudError {
    fn from(err: bson::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, CrudError>;
