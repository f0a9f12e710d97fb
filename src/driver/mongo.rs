//! MongoDB driver - implementazione del contratto sopra il crate `mongodb`
//!
//! [`MongoClient`] apre il client, verifica la connessione con un `ping` e tiene lo
//! stato letto da [`DocumentClient::is_connected`]. [`MongoCollection`] inoltra ogni
//! primitiva alla `mongodb::Collection<Document>` corrispondente.

use super::{
    DocumentClient, DocumentCollection, DriverResult, FindOneAndDeleteOptions, FindOneAndUpdateOptions,
    FindOptions, ReturnDocument,
};
use bson::{Document, doc, oid::ObjectId};
use futures_util::TryStreamExt;
use mongodb::options::{self as mongo_options, ClientOptions};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

// ****** CLIENT ****** //

/// Connection handle over a `mongodb::Client`
#[derive(Clone)]
pub struct MongoClient {
    client: mongodb::Client,
    /// Result of the last `ping`
    connected: Arc<AtomicBool>,
}

impl MongoClient {
    /// Opens a client on `url` and checks it with a `ping`
    ///
    /// # Arguments
    /// * `url` - MongoDB connection string (`mongodb://` or `mongodb+srv://`)
    /// * `timeout` - Upper bound for connecting and for selecting a server
    ///
    /// # Returns
    /// * `Ok(MongoClient)` - Client that answered the ping
    /// * `Err(DriverError)` - Malformed URL, or no server reachable within `timeout`
    #[instrument(skip(url))]
    pub async fn connect(url: &str, timeout: Duration) -> DriverResult<Self> {
        debug!("Parsing connection string");
        let mut options = ClientOptions::parse(url).await?;
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Self {
            client: mongodb::Client::with_options(options)?,
            connected: Arc::new(AtomicBool::new(false)),
        };
        client.ping().await?;

        info!("Connected to MongoDB");
        Ok(client)
    }

    /// Round trip to the server; refreshes the state reported by `is_connected`
    pub async fn ping(&self) -> DriverResult<()> {
        let result = self
            .client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await;
        self.connected.store(result.is_ok(), Ordering::SeqCst);

        if let Err(err) = result {
            warn!("MongoDB ping failed: {}", err);
            return Err(err.into());
        }
        Ok(())
    }
}

impl DocumentClient for MongoClient {
    type Collection = MongoCollection;

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn collection(&self, database: &str, name: &str) -> MongoCollection {
        MongoCollection {
            inner: self.client.database(database).collection::<Document>(name),
        }
    }
}

// ****** COLLECTION ****** //

#[derive(Clone)]
pub struct MongoCollection {
    inner: mongodb::Collection<Document>,
}

impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn find(&self, filter: Document, options: FindOptions) -> DriverResult<Vec<Document>> {
        let cursor = self
            .inner
            .find(filter, mongo_options::FindOptions::from(options))
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn count_documents(&self, filter: Document) -> DriverResult<u64> {
        Ok(self.inner.count_documents(filter, None).await?)
    }

    async fn insert_one(&self, mut document: Document) -> DriverResult<Document> {
        // the caller gets the stored image back, `_id` included
        if !document.contains_key("_id") {
            document.insert("_id", ObjectId::new());
        }
        self.inner.insert_one(&document, None).await?;
        Ok(document)
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: FindOneAndUpdateOptions,
    ) -> DriverResult<Option<Document>> {
        let updated = self
            .inner
            .find_one_and_update(filter, update, mongo_options::FindOneAndUpdateOptions::from(options))
            .await?;
        Ok(updated)
    }

    async fn find_one_and_delete(
        &self,
        filter: Document,
        options: FindOneAndDeleteOptions,
    ) -> DriverResult<Option<Document>> {
        let deleted = self
            .inner
            .find_one_and_delete(filter, mongo_options::FindOneAndDeleteOptions::from(options))
            .await?;
        Ok(deleted)
    }
}

// ****** OPTIONS ****** //

impl From<ReturnDocument> for mongo_options::ReturnDocument {
    fn from(value: ReturnDocument) -> Self {
        match value {
            ReturnDocument::Before => mongo_options::ReturnDocument::Before,
            ReturnDocument::After => mongo_options::ReturnDocument::After,
        }
    }
}

impl From<FindOptions> for mongo_options::FindOptions {
    fn from(value: FindOptions) -> Self {
        let mut options = mongo_options::FindOptions::default();
        options.limit = value.limit;
        options.skip = value.skip;
        options.sort = value.sort;
        options.projection = value.projection;
        options
    }
}

impl From<FindOneAndUpdateOptions> for mongo_options::FindOneAndUpdateOptions {
    fn from(value: FindOneAndUpdateOptions) -> Self {
        let mut options = mongo_options::FindOneAndUpdateOptions::default();
        options.return_document = Some(value.return_document.into());
        options.projection = value.projection;
        options.sort = value.sort;
        options.upsert = Some(value.upsert);
        options
    }
}

impl From<FindOneAndDeleteOptions> for mongo_options::FindOneAndDeleteOptions {
    fn from(value: FindOneAndDeleteOptions) -> Self {
        let mut options = mongo_options::FindOneAndDeleteOptions::default();
        options.projection = value.projection;
        options.sort = value.sort;
        options
    }
}
