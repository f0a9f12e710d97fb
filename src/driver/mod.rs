//! Driver contract - what the stores need from a document-store driver
//!
//! The stores never talk to a database directly: they orchestrate calls to the
//! primitives below. [`mongo::MongoClient`] implements them over the `mongodb`
//! crate; any other connection handle with a collection accessor can do the same.

pub mod mongo;

pub use mongo::{MongoClient, MongoCollection};

use bson::Document;

/// Errors raised by a driver. The stores propagate them unchanged.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type DriverResult<T> = Result<T, DriverError>;

/// Which image `find_one_and_update` hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnDocument {
    /// Document as it was before the update
    Before,
    /// Document as it is after the update
    #[default]
    After,
}

/// Options for [`DocumentCollection::find`]
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
}

/// Options for [`DocumentCollection::find_one_and_update`]
#[derive(Debug, Clone, Default)]
pub struct FindOneAndUpdateOptions {
    pub return_document: ReturnDocument,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub upsert: bool,
}

/// Options for [`DocumentCollection::find_one_and_delete`]
#[derive(Debug, Clone, Default)]
pub struct FindOneAndDeleteOptions {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
}

/// Connection handle
///
/// # Type Parameters
/// * `Collection` - Handle type returned when selecting a collection
pub trait DocumentClient: Send + Sync {
    type Collection: DocumentCollection;

    /// Whether the connection is currently live
    fn is_connected(&self) -> bool;

    /// Selects a collection by name within a named database
    ///
    /// # Arguments
    /// * `database` - Name of the database
    /// * `name` - Name of the collection inside `database`
    fn collection(&self, database: &str, name: &str) -> Self::Collection;
}

/// The store primitives consumed by [`crate::repositories::RecordStore`]
pub trait DocumentCollection: Send + Sync {
    /// Name of the collection
    fn name(&self) -> &str;

    /// Returns every document matching `filter`, shaped by `options`
    ///
    /// # Returns
    /// * `Ok(Vec<Document>)` - Matching documents (can be empty)
    /// * `Err(DriverError)` - Malformed filter, transport failure, ...
    async fn find(&self, filter: Document, options: FindOptions) -> DriverResult<Vec<Document>>;

    /// Counts the documents matching `filter`
    async fn count_documents(&self, filter: Document) -> DriverResult<u64>;

    /// Inserts one document
    ///
    /// # Returns
    /// * `Ok(Document)` - Stored document, including the `_id` assigned by the store
    async fn insert_one(&self, document: Document) -> DriverResult<Document>;

    /// Applies `update` (an operator document) to the first document matching `filter`
    ///
    /// # Returns
    /// * `Ok(Some(Document))` - Pre or post image, depending on `options.return_document`
    /// * `Ok(None)` - Nothing matched (and no upsert happened, or the pre image was requested)
    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: FindOneAndUpdateOptions,
    ) -> DriverResult<Option<Document>>;

    /// Deletes the first document matching `filter`
    ///
    /// # Returns
    /// * `Ok(Some(Document))` - The deleted document
    /// * `Ok(None)` - Nothing matched
    async fn find_one_and_delete(
        &self,
        filter: Document,
        options: FindOneAndDeleteOptions,
    ) -> DriverResult<Option<Document>>;
}
