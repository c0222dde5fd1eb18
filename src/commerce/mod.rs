//! Remote commerce API layer.
//!
//! This module provides the HTTP surface the engine consumes:
//!
//! - **Secure credential handling** via `secrecy::SecretString`
//! - **Safe logging** that never leaks keys, secrets, or full URLs
//! - A catalog resolver mapping products to their sellable variants
//! - An order submitter with per-submission outcome classification

pub mod catalog;
pub mod client;
pub mod orders;

use secrecy::SecretString;

pub use catalog::{fetch_catalog, CatalogMap};
pub use client::CommerceClient;
pub use orders::{OrderPayload, SubmitOrder};

// ─────────────────────────────────────────────────────────────────────────────
// StoreCredentials
// ─────────────────────────────────────────────────────────────────────────────

/// Credentials and endpoint for one logical account ("store").
///
/// Sensitive fields are wrapped in `SecretString` to prevent accidental
/// exposure through `Debug` or logging.
#[derive(Clone)]
pub struct StoreCredentials {
    /// Unique account name this store is registered under.
    pub account: String,
    /// API key for basic authentication.
    pub api_key: SecretString,
    /// API secret for basic authentication.
    pub api_secret: SecretString,
    /// Store endpoint base URL (e.g., "https://example.myshopify.com").
    pub store_endpoint: String,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("account", &self.account)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("store_endpoint", &self.store_endpoint)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AccountDirectory
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only lookup from account name to store credentials.
///
/// Supplied by configuration management outside the engine; the engine only
/// consumes it.
pub trait AccountDirectory: Send + Sync {
    fn lookup(&self, account: &str) -> Option<StoreCredentials>;
}
