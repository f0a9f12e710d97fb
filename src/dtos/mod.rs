//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene le strutture di richiesta usate dalle operazioni degli store:
//! parametri di lettura, opzioni di scrittura, specifiche di update e target dei subdocument.
//! Separano la forma della richiesta dal documento effettivamente inviato al driver.

pub mod query;
pub mod subdocument;
pub mod update;

// Re-exports per facilitare l'import
pub use query::{ListQuery, WriteOptions};
pub use subdocument::{DEFAULT_ELEMENT_ALIAS, SubdocumentTarget, require_value};
pub use update::UpdateSpec;
