//! Repositories module - Coordinatore per gli store della libreria
//!
//! - [`RecordStore`]: CRUD generico su una collection, più le operazioni sugli array di subdocument
//! - [`AuditedRecordStore`]: stessa interfaccia, ogni scrittura viene registrata nella collection di audit
//!
//! Entrambi implementano i trait di [`traits`], così il codice chiamante può essere generico
//! sulla capacità che usa (lettura, scrittura, subdocument) senza sapere se c'è audit.

// ************************* MODULI REPOSITORY ************************* //

pub mod audited;
pub mod paths;
pub mod record;
pub mod traits;

// Re-esportazione dei trait per facilitare l'import
pub use traits::{Create, Delete, Read, Subdocuments, Update};

// Re-esportazione degli store
pub use audited::AuditedRecordStore;
pub use paths::{element_match, element_query, positional_assignment};
pub use record::{RecordStore, TimestampFields};
