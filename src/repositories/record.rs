//! RecordStore - Repository generico per una collection di record
//!
//! Traduce le operazioni CRUD (e quelle sugli array di subdocument) in chiamate alle
//! primitive del driver. Non esegue I/O per conto proprio: costruisce filtri, documenti
//! di update e proiezioni, e valida gli argomenti prima di toccare il driver.

use super::paths::{element_match, lookup, merged, positional_assignment, project, single};
use super::{Create, Delete, Read, Subdocuments, Update};
use crate::core::{CrudError, Result};
use crate::driver::{DocumentClient, DocumentCollection, FindOptions};
use crate::dtos::{ListQuery, SubdocumentTarget, UpdateSpec, WriteOptions};
use crate::entities::{IntoRecordId, Record, RecordId};
use bson::{Bson, Document, doc};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Names of the timestamp fields maintained by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFields {
    /// Stamped once by `create`
    pub created: String,
    /// Stamped by every update, patch and subdocument write
    pub updated: String,
}

impl Default for TimestampFields {
    fn default() -> Self {
        Self {
            created: "createdAt".to_string(),
            updated: "updatedAt".to_string(),
        }
    }
}

// RECORD STORE
pub struct RecordStore<C: DocumentClient> {
    client: Arc<C>,
    database: String,
    name: String,
    timestamps: TimestampFields,
    /// Resolved on first use, once the client reports a live connection
    collection: OnceLock<C::Collection>,
}

impl<C: DocumentClient> RecordStore<C> {
    pub fn new(client: Arc<C>, database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
            name: name.into(),
            timestamps: TimestampFields::default(),
            collection: OnceLock::new(),
        }
    }

    pub fn with_timestamps(mut self, timestamps: TimestampFields) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Name of the collection
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn timestamps(&self) -> &TimestampFields {
        &self.timestamps
    }

    /// Collection handle, checked against the client's connection state on every call
    ///
    /// # Returns
    /// * `Ok(&C::Collection)` - Live handle
    /// * `Err(CrudError::NotConnected)` - The client reports no live connection
    pub(crate) fn connection(&self) -> Result<&C::Collection> {
        if !self.client.is_connected() {
            warn!(database = %self.database, collection = %self.name, "Client is not connected");
            return Err(CrudError::not_connected(&self.database, &self.name));
        }
        Ok(self
            .collection
            .get_or_init(|| self.client.collection(&self.database, &self.name)))
    }

    fn now() -> bson::DateTime {
        bson::DateTime::from_chrono(Utc::now())
    }

    /// Sends an update built from `spec` to the first record matching `filter`
    async fn modify(&self, filter: Document, spec: UpdateSpec, options: &WriteOptions) -> Result<Option<Record>> {
        let now = Self::now();
        let mut update = spec.into_update(&self.timestamps.updated, now)?;
        if options.upsert {
            stamp_on_insert(&mut update, &self.timestamps.created, now)?;
        }
        let collection = self.connection()?;
        let updated = collection
            .find_one_and_update(filter, update, options.update_options())
            .await?;

        if updated.is_some() {
            debug!("Record updated");
        } else {
            warn!("No record matched the update");
        }
        Ok(updated)
    }

    /// Reads the first record matching `filter` and deserializes it into `T`
    ///
    /// # Returns
    /// * `Err(CrudError::Serialization)` - The stored shape does not fit `T`
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Option<T>> {
        match self.get(filter, projection).await? {
            Some(record) => Ok(Some(bson::from_document(record)?)),
            None => Ok(None),
        }
    }

    /// Lists records and deserializes each into `T`
    pub async fn list_as<T: DeserializeOwned>(&self, query: ListQuery) -> Result<Vec<T>> {
        self.list(query)
            .await?
            .into_iter()
            .map(|record| bson::from_document(record).map_err(CrudError::from))
            .collect()
    }
}

/// Adds `$setOnInsert: {created: now}` unless the caller already sets the field
fn stamp_on_insert(update: &mut Document, created_field: &str, now: bson::DateTime) -> Result<()> {
    let already_set = ["$set", "$setOnInsert"].iter().any(|op| {
        update
            .get_document(op)
            .map(|fields| fields.contains_key(created_field))
            .unwrap_or(false)
    });
    if already_set {
        return Ok(());
    }
    match update.get_mut("$setOnInsert") {
        Some(Bson::Document(fields)) => {
            fields.insert(created_field, now);
        }
        Some(_) => return Err(CrudError::invalid_argument("$setOnInsert must be a document")),
        None => {
            update.insert("$setOnInsert", single(created_field, now));
        }
    }
    Ok(())
}

/// Projects a document element; primitives pass through
fn project_element(element: Bson, projection: Option<&Document>) -> Bson {
    match element {
        Bson::Document(fields) => Bson::Document(project(&fields, projection)),
        other => other,
    }
}

impl<C: DocumentClient> Create for RecordStore<C> {
    #[instrument(skip(self, document, options), fields(collection = %self.name))]
    async fn create(&self, mut document: Document, options: &WriteOptions) -> Result<Record> {
        debug!("Creating new record");
        options.validate()?;
        let collection = self.connection()?;
        document.insert(self.timestamps.created.as_str(), Self::now());
        let created = collection.insert_one(document).await?;

        info!("Record created with id {:?}", created.get("_id"));
        Ok(created)
    }
}

impl<C: DocumentClient> Read for RecordStore<C> {
    #[instrument(skip(self, query), fields(collection = %self.name))]
    async fn list(&self, query: ListQuery) -> Result<Vec<Record>> {
        debug!("Listing records");
        query.validate()?;
        let collection = self.connection()?;
        let (filter, options) = query.into_parts();
        let records = collection.find(filter, options).await?;

        debug!("Found {} records", records.len());
        Ok(records)
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    async fn count(&self, filter: Option<Document>) -> Result<u64> {
        let collection = self.connection()?;
        let count = collection.count_documents(filter.unwrap_or_default()).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    async fn exists(&self, filter: Document) -> Result<bool> {
        if filter.is_empty() {
            return Err(CrudError::invalid_argument("exists requires a non-empty filter"));
        }
        let collection = self.connection()?;
        let options = FindOptions {
            limit: Some(1),
            projection: Some(doc! { "_id": 1 }),
            ..Default::default()
        };
        let found = collection.find(filter, options).await?;
        Ok(!found.is_empty())
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    async fn get(&self, filter: Document, projection: Option<Document>) -> Result<Option<Record>> {
        debug!("Reading record");
        let collection = self.connection()?;
        let options = FindOptions {
            limit: Some(1),
            projection,
            ..Default::default()
        };
        let record = collection.find(filter, options).await?.into_iter().next();

        if record.is_none() {
            debug!("Record not found");
        }
        Ok(record)
    }
}

impl<C: DocumentClient> Update for RecordStore<C> {
    #[instrument(skip(self, options), fields(collection = %self.name))]
    async fn update(&self, filter: Document, operators: Document, options: &WriteOptions) -> Result<Option<Record>> {
        debug!("Updating record");
        options.validate()?;
        self.modify(filter, UpdateSpec::Operators(operators), options).await
    }

    #[instrument(skip(self, options), fields(collection = %self.name))]
    async fn patch(&self, filter: Document, fields: Document, options: &WriteOptions) -> Result<Option<Record>> {
        debug!("Patching record");
        options.validate()?;
        self.modify(filter, UpdateSpec::Assign(fields), options).await
    }
}

impl<C: DocumentClient> Delete for RecordStore<C> {
    #[instrument(skip(self, options), fields(collection = %self.name))]
    async fn remove(&self, filter: Document, options: &WriteOptions) -> Result<Option<Record>> {
        debug!("Removing record");
        let collection = self.connection()?;
        let removed = collection
            .find_one_and_delete(filter, options.delete_options())
            .await?;

        match &removed {
            Some(record) => info!("Record {:?} removed", record.get("_id")),
            None => warn!("No record matched the removal"),
        }
        Ok(removed)
    }
}

impl<C: DocumentClient> Subdocuments for RecordStore<C> {
    #[instrument(skip(self, id), fields(collection = %self.name))]
    async fn list_subdocuments(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        alias: Option<&str>,
        element_filter: Option<Bson>,
    ) -> Result<Option<Vec<Bson>>> {
        let target = SubdocumentTarget::parse(array_field, alias)?;
        let id = id.into_record_id()?;

        let selection = match element_filter {
            Some(cond) => Bson::Document(doc! {
                "$filter": {
                    "input": format!("${}", target.array_field),
                    "as": target.alias(),
                    "cond": cond,
                }
            }),
            None => Bson::Int32(1),
        };
        let Some(parent) = self
            .get(id.filter(), Some(single(&target.array_field, selection)))
            .await?
        else {
            return Ok(None);
        };

        let elements = match lookup(&parent, &target.array_field) {
            Some(Bson::Array(elements)) => elements.clone(),
            _ => Vec::new(),
        };
        debug!("Found {} elements", elements.len());
        Ok(Some(elements))
    }

    #[instrument(skip(self, id), fields(collection = %self.name))]
    async fn get_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        element_query: Document,
        projection: Option<Document>,
    ) -> Result<Option<Bson>> {
        let target = SubdocumentTarget::for_query(array_field, &element_query)?;
        let id = id.into_record_id()?;

        let filter = merged(id.filter(), element_match(&target.array_field, &element_query));
        let positional = single(&format!("{}.$", target.array_field), 1);
        let Some(parent) = self.get(filter, Some(positional)).await? else {
            return Ok(None);
        };

        let element = match lookup(&parent, &target.array_field) {
            Some(Bson::Array(elements)) => elements.first().cloned(),
            _ => None,
        };
        Ok(element.map(|element| project_element(element, projection.as_ref())))
    }

    #[instrument(skip(self, id, options), fields(collection = %self.name))]
    async fn add_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        value: Bson,
        options: &WriteOptions,
    ) -> Result<Option<Record>> {
        let target = SubdocumentTarget::for_add(array_field, &value)?;
        options.validate()?;
        let id = id.into_record_id()?;

        let value = match value {
            Bson::Document(mut element) => {
                element.insert("_id", RecordId::new());
                Bson::Document(element)
            }
            other => other,
        };
        let operators = doc! { "$push": single(&target.array_field, value) };
        self.modify(id.filter(), UpdateSpec::Operators(operators), options)
            .await
    }

    #[instrument(skip(self, id, options), fields(collection = %self.name))]
    async fn patch_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        element_query: Document,
        fields: Document,
        options: &WriteOptions,
    ) -> Result<Option<Record>> {
        let target = SubdocumentTarget::for_patch(array_field, &element_query, &fields)?;
        options.validate()?;
        let id = id.into_record_id()?;

        let filter = merged(id.filter(), element_match(&target.array_field, &element_query));
        let assignment = positional_assignment(&target.array_field, &fields);
        self.modify(filter, UpdateSpec::Assign(assignment), options).await
    }

    #[instrument(skip(self, id, options), fields(collection = %self.name))]
    async fn remove_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        element: Bson,
        options: &WriteOptions,
    ) -> Result<Option<Record>> {
        let target = SubdocumentTarget::for_remove(array_field, &element)?;
        options.validate()?;
        let id = id.into_record_id()?;

        // the parent only matches while it still holds a matching element
        let matching = match &element {
            Bson::Document(predicate) => element_match(&target.array_field, predicate),
            value => single(&target.array_field, value.clone()),
        };
        let filter = merged(id.filter(), matching);
        let operators = doc! { "$pull": single(&target.array_field, element) };
        self.modify(filter, UpdateSpec::Operators(operators), options)
            .await
    }
}
