//! Entities module - Entità del dominio
//!
//! Questo modulo contiene le entità che rappresentano i dati persistiti:
//! i record (documenti) di una collezione e le entry di audit.

pub mod audit;
pub mod enums;
pub mod record;

// Re-exports per facilitare l'import
pub use audit::{ANONYMOUS_ACTOR, AuditEntry};
pub use enums::AuditOperation;
pub use record::{IntoRecordId, Record, RecordId};
