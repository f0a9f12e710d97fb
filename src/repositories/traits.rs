//! Common repository traits
//!
//! This module defines the capability interfaces shared by [`super::RecordStore`]
//! and [`super::AuditedRecordStore`]. Each trait covers one concern so a caller can
//! be generic over "something that can read" without caring whether writes are audited.
//!
//! The `*_by_id` methods are provided: they normalize the identifier and delegate to the
//! filter-based form, so an implementor that wraps the filter-based form (auditing, ...)
//! gets the same behavior on the id-based path for free.

use crate::core::Result;
use crate::dtos::{ListQuery, WriteOptions};
use crate::entities::{IntoRecordId, Record};
use crate::repositories::paths::single;
use bson::{Bson, Document};

/// Trait for inserting new records
pub trait Create {
    /// Inserts a record, stamping its creation timestamp
    ///
    /// # Arguments
    /// * `document` - Fields of the new record (an `_id`, if present, is kept)
    /// * `options` - Write options (only `actor` is meaningful here)
    ///
    /// # Returns
    /// * `Ok(Record)` - Stored record, including the identifier assigned by the store
    /// * `Err(CrudError)` - Not connected, or the driver refused the insert
    async fn create(&self, document: Document, options: &WriteOptions) -> Result<Record>;
}

/// Trait for reading records
pub trait Read {
    /// Lists the records matching a query
    ///
    /// # Arguments
    /// * `query` - Filter (defaults to everything), limit, skip, sort and projection
    ///
    /// # Returns
    /// * `Ok(Vec<Record>)` - Matching records in driver order (can be empty)
    /// * `Err(CrudError)` - Invalid query, not connected or driver failure
    async fn list(&self, query: ListQuery) -> Result<Vec<Record>>;

    /// Counts the records matching `filter` (every record when `None`)
    async fn count(&self, filter: Option<Document>) -> Result<u64>;

    /// Whether at least one record matches `filter`
    ///
    /// # Returns
    /// * `Err(CrudError::InvalidArgument)` - `filter` is empty
    async fn exists(&self, filter: Document) -> Result<bool>;

    /// Reads the first record matching `filter`
    ///
    /// # Arguments
    /// * `filter` - Match condition
    /// * `projection` - Optional field selection
    ///
    /// # Returns
    /// * `Ok(Some(Record))` - Record found
    /// * `Ok(None)` - Nothing matched
    async fn get(&self, filter: Document, projection: Option<Document>) -> Result<Option<Record>>;

    /// Reads a record by identifier
    ///
    /// # Arguments
    /// * `id` - Any supported identifier form (see [`IntoRecordId`])
    /// * `projection` - Optional field selection
    async fn get_by_id(&self, id: impl IntoRecordId, projection: Option<Document>) -> Result<Option<Record>> {
        let id = id.into_record_id()?;
        self.get(id.filter(), projection).await
    }
}

/// Trait for modifying existing records
///
/// Every method stamps the update timestamp and returns the post-update image.
pub trait Update {
    /// Applies an operator document to the first record matching `filter`
    ///
    /// # Arguments
    /// * `filter` - Match condition
    /// * `operators` - `$set`, `$unset`, `$push`, ... (all preserved)
    /// * `options` - Projection, sort, upsert and actor
    ///
    /// # Returns
    /// * `Ok(Some(Record))` - Updated record
    /// * `Ok(None)` - Nothing matched
    async fn update(&self, filter: Document, operators: Document, options: &WriteOptions) -> Result<Option<Record>>;

    /// [`Update::update`] by identifier
    async fn update_by_id(
        &self,
        id: impl IntoRecordId,
        operators: Document,
        options: &WriteOptions,
    ) -> Result<Option<Record>> {
        let id = id.into_record_id()?;
        self.update(id.filter(), operators, options).await
    }

    /// Assigns plain fields on the first record matching `filter`
    ///
    /// # Arguments
    /// * `fields` - Field assignments; `Bson::Undefined` values are omitted
    ///
    /// # Returns
    /// * `Ok(Some(Record))` - Updated record
    /// * `Ok(None)` - Nothing matched
    async fn patch(&self, filter: Document, fields: Document, options: &WriteOptions) -> Result<Option<Record>>;

    /// [`Update::patch`] by identifier
    async fn patch_by_id(
        &self,
        id: impl IntoRecordId,
        fields: Document,
        options: &WriteOptions,
    ) -> Result<Option<Record>> {
        let id = id.into_record_id()?;
        self.patch(id.filter(), fields, options).await
    }
}

/// Trait for deleting records
pub trait Delete {
    /// Deletes the first record matching `filter`
    ///
    /// # Returns
    /// * `Ok(Some(Record))` - The deleted record
    /// * `Ok(None)` - Nothing matched
    async fn remove(&self, filter: Document, options: &WriteOptions) -> Result<Option<Record>>;

    /// [`Delete::remove`] by identifier
    async fn remove_by_id(&self, id: impl IntoRecordId, options: &WriteOptions) -> Result<Option<Record>> {
        let id = id.into_record_id()?;
        self.remove(id.filter(), options).await
    }
}

/// Trait for operating on the elements of an array field of one record
///
/// `array_field` is a dotted path (`likes`, `profile.likes`). Elements are
/// returned as raw [`Bson`] since an array may hold primitives as well as subdocuments.
pub trait Subdocuments {
    /// Reads the elements of `array_field`, optionally filtered
    ///
    /// # Arguments
    /// * `id` - Parent record identifier
    /// * `array_field` - Path of the array
    /// * `alias` - Variable bound to each element in `element_filter` (default `item`)
    /// * `element_filter` - Expression evaluated per element, e.g. `{"$eq": ["$$item.name", "games"]}`
    ///
    /// # Returns
    /// * `Ok(Some(Vec<Bson>))` - Elements (empty when the filter matches none or the field is absent)
    /// * `Ok(None)` - The parent record does not exist
    async fn list_subdocuments(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        alias: Option<&str>,
        element_filter: Option<Bson>,
    ) -> Result<Option<Vec<Bson>>>;

    /// Reads the first element matching `element_query`
    ///
    /// # Arguments
    /// * `element_query` - Flat predicate on element fields, e.g. `{name: "games"}`
    /// * `projection` - Optional selection of the element's top-level fields
    ///
    /// # Returns
    /// * `Ok(Some(Bson))` - The matching element
    /// * `Ok(None)` - No parent, or no element matched
    async fn get_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        element_query: Document,
        projection: Option<Document>,
    ) -> Result<Option<Bson>>;

    /// Appends `value` to `array_field`; subdocuments get a fresh `_id`
    ///
    /// # Returns
    /// * `Ok(Some(Record))` - Updated parent
    /// * `Ok(None)` - The parent record does not exist
    async fn add_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        value: Bson,
        options: &WriteOptions,
    ) -> Result<Option<Record>>;

    /// Assigns `fields` on the first element matching `element_query`
    ///
    /// # Returns
    /// * `Ok(Some(Record))` - Updated parent
    /// * `Ok(None)` - No parent, or no element matched
    async fn patch_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        element_query: Document,
        fields: Document,
        options: &WriteOptions,
    ) -> Result<Option<Record>>;

    /// [`Subdocuments::patch_subdocument`] matching the element by its `_id`
    async fn patch_subdocument_by_id(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        element_id: impl IntoRecordId,
        fields: Document,
        options: &WriteOptions,
    ) -> Result<Option<Record>> {
        let element_id = element_id.into_record_id()?;
        self.patch_subdocument(id, array_field, element_id.filter(), fields, options)
            .await
    }

    /// Pulls every element matching `element` out of `array_field`
    ///
    /// # Arguments
    /// * `element` - Predicate document on element fields, or a primitive pulled by equality
    ///
    /// # Returns
    /// * `Ok(Some(Record))` - Updated parent
    /// * `Ok(None)` - No parent, or no element matched
    async fn remove_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        element: Bson,
        options: &WriteOptions,
    ) -> Result<Option<Record>>;

    /// [`Subdocuments::remove_subdocument`] matching the element by its `_id`
    async fn remove_subdocument_by_id(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        element_id: impl IntoRecordId,
        options: &WriteOptions,
    ) -> Result<Option<Record>> {
        let element_id = element_id.into_record_id()?;
        let predicate = single("_id", element_id);
        self.remove_subdocument(id, array_field, Bson::Document(predicate), options)
            .await
    }
}
