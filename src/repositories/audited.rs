//! AuditedRecordStore - RecordStore che registra ogni scrittura nella collection di audit
//!
//! Le letture sono delegate senza modifiche. Ogni scrittura andata a buon fine produce
//! una [`AuditEntry`] (CREATE, UPDATE o REMOVE) con l'immagine precedente e/o successiva
//! del record e l'attore preso da [`WriteOptions::actor`].
//!
//! Ordine garantito per ogni scrittura: lettura della pre-immagine (dove serve),
//! mutazione dei dati, scrittura dell'audit. Se la pre-immagine non esiste la scrittura
//! non viene eseguita e non viene registrato nulla. Se la scrittura dell'audit fallisce
//! la mutazione resta applicata e il chiamante riceve [`CrudError::AuditWrite`].
//!
//! La mutazione interna gira sempre senza proiezione: l'audit registra il record completo,
//! mentre il chiamante riceve l'immagine proiettata secondo [`WriteOptions::projection`].

use super::paths::project;
use super::record::RecordStore;
use super::{Create, Delete, Read, Subdocuments, Update};
use crate::core::config::DEFAULT_AUDIT_COLLECTION;
use crate::core::{CrudError, Result};
use crate::driver::{DocumentClient, DocumentCollection};
use crate::dtos::{ListQuery, SubdocumentTarget, WriteOptions};
use crate::entities::{AuditEntry, IntoRecordId, Record, RecordId};
use bson::{Bson, Document, doc};
use std::sync::OnceLock;
use tracing::{debug, error, info, instrument};
use validator::Validate;

// AUDITED RECORD STORE
pub struct AuditedRecordStore<C: DocumentClient> {
    inner: RecordStore<C>,
    audit_collection: String,
    /// Resolved together with the primary collection, on first use
    audit: OnceLock<C::Collection>,
}

impl<C: DocumentClient> AuditedRecordStore<C> {
    /// Wraps `inner`, writing entries to the default audit collection
    pub fn new(inner: RecordStore<C>) -> Self {
        Self::with_audit_collection(inner, DEFAULT_AUDIT_COLLECTION)
    }

    /// Wraps `inner`, writing entries to `audit_collection` in the same database
    pub fn with_audit_collection(inner: RecordStore<C>, audit_collection: impl Into<String>) -> Self {
        Self {
            inner,
            audit_collection: audit_collection.into(),
            audit: OnceLock::new(),
        }
    }

    /// The wrapped store; writes made through it are not audited
    pub fn inner(&self) -> &RecordStore<C> {
        &self.inner
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn audit_collection(&self) -> &str {
        &self.audit_collection
    }

    fn audit_connection(&self) -> Result<&C::Collection> {
        let client = self.inner.client();
        if !client.is_connected() {
            return Err(CrudError::not_connected(self.inner.database(), &self.audit_collection));
        }
        Ok(self
            .audit
            .get_or_init(|| client.collection(self.inner.database(), &self.audit_collection)))
    }

    /// Persists one entry; a driver failure here means the data write already committed
    async fn record(&self, audit: &C::Collection, entry: AuditEntry) -> Result<()> {
        let operation = entry.operation;
        let document = bson::to_document(&entry)?;
        audit.insert_one(document).await.map_err(|source| {
            error!(
                collection = %self.inner.name(),
                %operation,
                "Audit entry could not be written: {}",
                source
            );
            CrudError::AuditWrite { operation, source }
        })?;

        debug!(%operation, "Audit entry written");
        Ok(())
    }

    /// Records an UPDATE when the write produced a post image
    ///
    /// # Arguments
    /// * `new` - Full post image, as returned by a write made without projection
    /// * `projection` - The caller's projection, applied to the returned image only
    async fn record_update(
        &self,
        audit: &C::Collection,
        old: Record,
        new: Option<Record>,
        projection: Option<&Document>,
        options: &WriteOptions,
    ) -> Result<Option<Record>> {
        let Some(new) = new else {
            return Ok(None);
        };
        let returned = project(&new, projection);
        let entry = AuditEntry::updated(self.inner.name(), old, new, options.actor());
        self.record(audit, entry).await?;
        Ok(Some(returned))
    }

    /// First record matching `filter`, in the order the write will pick it
    async fn pre_image(&self, filter: &Document, options: &WriteOptions) -> Result<Option<Record>> {
        let mut query = ListQuery::new().filter(filter.clone()).limit(1);
        query.sort = options.sort.clone();
        Ok(self.inner.list(query).await?.into_iter().next())
    }

    async fn parent_image(&self, id: RecordId) -> Result<Option<Record>> {
        let parent = self.inner.get(id.filter(), None).await?;
        if parent.is_none() {
            debug!(%id, "Parent record not found, nothing to audit");
        }
        Ok(parent)
    }

    /// Entries written for this store's collection, newest first unless `query` sorts otherwise
    ///
    /// # Arguments
    /// * `query` - Extra filter (e.g. `{operation: "UPDATE"}`), pagination and sort
    ///
    /// # Returns
    /// * `Ok(Vec<AuditEntry>)` - Matching entries
    /// * `Err(CrudError::Serialization)` - An entry in the collection has an unexpected shape
    #[instrument(skip(self, query), fields(collection = %self.inner.name()))]
    pub async fn audit_trail(&self, query: ListQuery) -> Result<Vec<AuditEntry>> {
        query.validate()?;
        let audit = self.audit_connection()?;
        let (filter, mut options) = query.into_parts();

        let mut scoped = doc! { "collection": self.inner.name() };
        for (key, value) in filter {
            scoped.insert(key, value);
        }
        if options.sort.is_none() {
            options.sort = Some(doc! { "timestamp": -1, "_id": -1 });
        }

        audit
            .find(scoped, options)
            .await?
            .into_iter()
            .map(|entry| bson::from_document(entry).map_err(CrudError::from))
            .collect()
    }
}

impl<C: DocumentClient> Create for AuditedRecordStore<C> {
    #[instrument(skip(self, document, options), fields(collection = %self.inner.name(), actor = %options.actor()))]
    async fn create(&self, document: Document, options: &WriteOptions) -> Result<Record> {
        options.validate()?;
        let audit = self.audit_connection()?;
        let created = self.inner.create(document, options).await?;

        let entry = AuditEntry::created(self.inner.name(), created.clone(), options.actor());
        self.record(audit, entry).await?;
        info!("Record created and audited");
        Ok(created)
    }
}

impl<C: DocumentClient> Read for AuditedRecordStore<C> {
    async fn list(&self, query: ListQuery) -> Result<Vec<Record>> {
        self.inner.list(query).await
    }

    async fn count(&self, filter: Option<Document>) -> Result<u64> {
        self.inner.count(filter).await
    }

    async fn exists(&self, filter: Document) -> Result<bool> {
        self.inner.exists(filter).await
    }

    async fn get(&self, filter: Document, projection: Option<Document>) -> Result<Option<Record>> {
        self.inner.get(filter, projection).await
    }
}

impl<C: DocumentClient> Update for AuditedRecordStore<C> {
    #[instrument(skip(self, options), fields(collection = %self.inner.name(), actor = %options.actor()))]
    async fn update(&self, filter: Document, operators: Document, options: &WriteOptions) -> Result<Option<Record>> {
        options.validate()?;
        let audit = self.audit_connection()?;
        let Some(old) = self.pre_image(&filter, options).await? else {
            debug!("No record matched, update skipped");
            return Ok(None);
        };

        let (full, projection) = options.without_projection();
        let new = self.inner.update(filter, operators, &full).await?;
        self.record_update(audit, old, new, projection.as_ref(), options).await
    }

    #[instrument(skip(self, options), fields(collection = %self.inner.name(), actor = %options.actor()))]
    async fn patch(&self, filter: Document, fields: Document, options: &WriteOptions) -> Result<Option<Record>> {
        options.validate()?;
        let audit = self.audit_connection()?;
        let Some(old) = self.pre_image(&filter, options).await? else {
            debug!("No record matched, patch skipped");
            return Ok(None);
        };

        let (full, projection) = options.without_projection();
        let new = self.inner.patch(filter, fields, &full).await?;
        self.record_update(audit, old, new, projection.as_ref(), options).await
    }
}

impl<C: DocumentClient> Delete for AuditedRecordStore<C> {
    #[instrument(skip(self, options), fields(collection = %self.inner.name(), actor = %options.actor()))]
    async fn remove(&self, filter: Document, options: &WriteOptions) -> Result<Option<Record>> {
        options.validate()?;
        let audit = self.audit_connection()?;
        let (full, projection) = options.without_projection();
        let Some(removed) = self.inner.remove(filter, &full).await? else {
            return Ok(None);
        };

        let returned = project(&removed, projection.as_ref());
        let entry = AuditEntry::removed(self.inner.name(), removed, options.actor());
        self.record(audit, entry).await?;
        Ok(Some(returned))
    }
}

impl<C: DocumentClient> Subdocuments for AuditedRecordStore<C> {
    async fn list_subdocuments(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        alias: Option<&str>,
        element_filter: Option<Bson>,
    ) -> Result<Option<Vec<Bson>>> {
        self.inner
            .list_subdocuments(id, array_field, alias, element_filter)
            .await
    }

    async fn get_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        element_query: Document,
        projection: Option<Document>,
    ) -> Result<Option<Bson>> {
        self.inner
            .get_subdocument(id, array_field, element_query, projection)
            .await
    }

    #[instrument(skip(self, id, options), fields(collection = %self.inner.name(), actor = %options.actor()))]
    async fn add_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        value: Bson,
        options: &WriteOptions,
    ) -> Result<Option<Record>> {
        SubdocumentTarget::for_add(array_field, &value)?;
        options.validate()?;
        let id = id.into_record_id()?;
        let audit = self.audit_connection()?;
        let Some(old) = self.parent_image(id).await? else {
            return Ok(None);
        };

        let (full, projection) = options.without_projection();
        let new = self.inner.add_subdocument(id, array_field, value, &full).await?;
        self.record_update(audit, old, new, projection.as_ref(), options).await
    }

    #[instrument(skip(self, id, options), fields(collection = %self.inner.name(), actor = %options.actor()))]
    async fn patch_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        element_query: Document,
        fields: Document,
        options: &WriteOptions,
    ) -> Result<Option<Record>> {
        SubdocumentTarget::for_patch(array_field, &element_query, &fields)?;
        options.validate()?;
        let id = id.into_record_id()?;
        let audit = self.audit_connection()?;
        let Some(old) = self.parent_image(id).await? else {
            return Ok(None);
        };

        let (full, projection) = options.without_projection();
        let new = self
            .inner
            .patch_subdocument(id, array_field, element_query, fields, &full)
            .await?;
        self.record_update(audit, old, new, projection.as_ref(), options).await
    }

    #[instrument(skip(self, id, options), fields(collection = %self.inner.name(), actor = %options.actor()))]
    async fn remove_subdocument(
        &self,
        id: impl IntoRecordId,
        array_field: &str,
        element: Bson,
        options: &WriteOptions,
    ) -> Result<Option<Record>> {
        SubdocumentTarget::for_remove(array_field, &element)?;
        options.validate()?;
        let id = id.into_record_id()?;
        let audit = self.audit_connection()?;
        let Some(old) = self.parent_image(id).await? else {
            return Ok(None);
        };

        let (full, projection) = options.without_projection();
        let new = self
            .inner
            .remove_subdocument(id, array_field, element, &full)
            .await?;
        self.record_update(audit, old, new, projection.as_ref(), options).await
    }
}
