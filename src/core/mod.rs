//! Core Module - Componenti infrastrutturali della libreria
//!
//! Questo modulo contiene tutti i componenti "core":
//! - Configurazione
//! - Gestione errori
//! - Logging
//! - Stato applicazione (client + store per collezione)

pub mod config;
pub mod error;
pub mod logging;
pub mod state;

// Re-exports per facilitare l'import
pub use config::Config;
pub use error::{CrudError, Result};
pub use logging::init_tracing;
pub use state::AppState;
