//! Application State - Stato condiviso dell'applicazione
//!
//! Tiene il client del driver e la configurazione, e costruisce gli store per collezione.

use crate::core::{Config, Result};
use crate::driver::{DocumentClient, MongoClient};
use crate::repositories::{AuditedRecordStore, RecordStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Stato condiviso tra tutti i componenti che accedono al database
pub struct AppState<C: DocumentClient> {
    /// Client del driver, condiviso da tutti gli store
    pub client: Arc<C>,

    /// Configurazione caricata all'avvio
    pub config: Config,
}

impl<C: DocumentClient> AppState<C> {
    /// Crea una nuova istanza di AppState
    ///
    /// # Arguments
    /// * `client` - Client del driver già connesso (o in fase di connessione)
    /// * `config` - Configurazione, tipicamente da [`Config::from_env`]
    pub fn new(client: Arc<C>, config: Config) -> Self {
        Self { client, config }
    }

    /// Store senza audit per la collection `collection` del database configurato
    pub fn records(&self, collection: &str) -> RecordStore<C> {
        RecordStore::new(self.client.clone(), &self.config.database_name, collection)
    }

    /// Store con audit per la collection `collection`, sulla collection di audit configurata
    pub fn audited(&self, collection: &str) -> AuditedRecordStore<C> {
        AuditedRecordStore::with_audit_collection(self.records(collection), &self.config.audit_collection)
    }
}

impl AppState<MongoClient> {
    /// Connette il client MongoDB a `config.database_url` e costruisce lo stato
    ///
    /// # Returns
    /// * `Ok(AppState)` - Client connesso (ha risposto al ping)
    /// * `Err(CrudError::Store)` - URL non valido o server non raggiungibile entro il timeout
    pub async fn connect(config: Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.connect_timeout_secs);
        let client = MongoClient::connect(&config.database_url, timeout).await?;

        info!(database = %config.database_name, "Store ready");
        Ok(Self::new(Arc::new(client), config))
    }
}
