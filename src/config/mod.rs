//! Configuration module for the university backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Number of students shown per list page unless overridden.
pub const DEFAULT_PAGE_SIZE: i64 = 3;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key required by maintenance routes (disabled when unset)
    pub maintenance_key: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of plain text
    pub log_json: bool,
    /// Page size for paginated lists
    pub page_size: i64,
    /// Seed sample data into an empty database on startup
    pub seed: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let maintenance_key = env::var("UNIVERSITY_MAINTENANCE_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let db_path = env::var("UNIVERSITY_DB_PATH")
            .unwrap_or_else(|_| "./data/university.sqlite".to_string())
            .into();

        let bind_addr = env::var("UNIVERSITY_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|e| format!("Invalid UNIVERSITY_BIND_ADDR '{}': {}", bind_addr, e))?;

        let log_level = env::var("UNIVERSITY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = parse_flag("UNIVERSITY_LOG_JSON")?;
        let seed = parse_flag("UNIVERSITY_SEED")?;

        let page_size = match env::var("UNIVERSITY_PAGE_SIZE") {
            Ok(raw) => match raw.parse::<i64>() {
                Ok(size) if size > 0 => size,
                _ => return Err(format!("Invalid UNIVERSITY_PAGE_SIZE '{}'", raw)),
            },
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            maintenance_key,
            db_path,
            bind_addr,
            log_level,
            log_json,
            page_size,
            seed,
        })
    }
}

fn parse_flag(name: &str) -> Result<bool, String> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(format!("Invalid {} '{}'", name, raw)),
        },
        Err(_) => Ok(false),
    }
}
