//! Query DTOs - Data Transfer Objects per letture e opzioni di scrittura

use crate::driver::{FindOneAndDeleteOptions, FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use crate::entities::ANONYMOUS_ACTOR;
use bson::Document;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Parameters of a `list` call: filter, pagination, ordering and projection
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Validate)]
#[serde(default)]
pub struct ListQuery {
    /// Defaults to every record
    pub filter: Option<Document>,

    #[validate(range(min = 0, message = "limit must not be negative"))]
    pub limit: Option<i64>,

    pub skip: Option<u64>,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Document) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    pub(crate) fn into_parts(self) -> (Document, FindOptions) {
        let options = FindOptions {
            limit: self.limit,
            skip: self.skip,
            sort: self.sort,
            projection: self.projection,
        };
        (self.filter.unwrap_or_default(), options)
    }
}

/// Options shared by every write
///
/// `projection`, `sort` and `upsert` are forwarded to the driver's
/// find-one-and-* calls; `actor` is only read by the audited store.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Validate)]
#[serde(default)]
pub struct WriteOptions {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub upsert: bool,

    #[validate(length(min = 1, max = 256, message = "actor must be between 1 and 256 characters"))]
    pub actor: Option<String>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes the write to `actor` in the audit trail
    pub fn as_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    /// Actor to record, falling back to the anonymous sentinel
    pub fn actor(&self) -> &str {
        self.actor.as_deref().unwrap_or(ANONYMOUS_ACTOR)
    }

    /// The same options with the projection split off, so a write returns the full image
    pub(crate) fn without_projection(&self) -> (WriteOptions, Option<Document>) {
        let mut options = self.clone();
        let projection = options.projection.take();
        (options, projection)
    }

    pub(crate) fn update_options(&self) -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions {
            return_document: ReturnDocument::After,
            projection: self.projection.clone(),
            sort: self.sort.clone(),
            upsert: self.upsert,
        }
    }

    pub(crate) fn delete_options(&self) -> FindOneAndDeleteOptions {
        FindOneAndDeleteOptions {
            projection: self.projection.clone(),
            sort: self.sort.clone(),
        }
    }
}
