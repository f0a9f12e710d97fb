use dotenv::dotenv;
use std::env;
use tracing::info;

pub const DEFAULT_DATABASE_NAME: &str = "app";
pub const DEFAULT_AUDIT_COLLECTION: &str = "audit";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_name: String,
    pub audit_collection: String,
    pub connect_timeout_secs: u64,
    pub app_env: String,
    pub log_filter: String,
}

impl Config {
    /// Carica la configurazione dalle variabili d'ambiente
    /// Chiama dotenv() automaticamente
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same parsing as [`Config::from_env`], over an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| "DATABASE_URL must be set in .env file".to_string())?;

        let database_name = lookup("DATABASE_NAME")
            .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string());
        if database_name.is_empty() || database_name.contains(['.', '$', ' ', '/']) {
            return Err(format!(
                "Invalid DATABASE_NAME '{database_name}': must be non-empty and contain no '.', '$', '/' or spaces"
            ));
        }

        let audit_collection = lookup("AUDIT_COLLECTION")
            .unwrap_or_else(|| DEFAULT_AUDIT_COLLECTION.to_string());
        if audit_collection.is_empty() || audit_collection.starts_with('$') {
            return Err("Invalid AUDIT_COLLECTION: must be non-empty and not start with '$'".to_string());
        }

        let connect_timeout_secs = lookup("CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|| DEFAULT_CONNECT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| "Invalid CONNECT_TIMEOUT_SECS: must be a positive number".to_string())?;

        let app_env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());

        let log_filter = lookup("LOG_FILTER").unwrap_or_else(|| "info".to_string());

        Ok(Config {
            database_url,
            database_name,
            audit_collection,
            connect_timeout_secs,
            app_env,
            log_filter,
        })
    }

    /// Logga la configurazione (nascondendo le credenziali)
    pub fn print_info(&self) {
        info!("Store configuration:");
        info!("   Environment: {}", self.app_env);
        info!("   Database URL: {}", Self::mask_url(&self.database_url));
        info!("   Database: {}", self.database_name);
        info!("   Audit collection: {}", self.audit_collection);
        info!("   Connect timeout: {}s", self.connect_timeout_secs);
        info!("   Log filter: {}", self.log_filter);
    }

    /// Maschera l'URL del database per il logging
    fn mask_url(url: &str) -> String {
        if let Some(at_pos) = url.rfind('@') {
            if let Some(scheme_end) = url.find("://") {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos..];
                return format!("{}***{}", scheme, after_at);
            }
        }
        if url.contains("://") {
            return url.to_string();
        }
        "***".to_string()
    }
}
