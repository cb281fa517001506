//! Identity repository
//!
//! Lookup and mutation of the persisted identities: WiFi clients keyed by
//! MAC, the phone registry, the employee phone association, and the
//! blacklist. Lookups return plain value objects; callers never hold a
//! storage session.
//!
//! All writes tolerate concurrent duplicate inserts: two first-time
//! authentications for the same MAC or phone must converge to a single row
//! rather than surfacing a constraint violation.

mod memory;
mod postgres;

pub use memory::MemoryIdentityRepository;
pub use postgres::PgIdentityRepository;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Unknown client: {0}")]
    UnknownClient(String),
}

/// A WiFi client row, detached from storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiClient {
    pub mac: String,
    pub expiration: NaiveDateTime,
    pub employee: bool,
    /// Phone number of the linked registry record, if any
    pub phone: Option<String>,
    pub fingerprint: Option<String>,
}

/// A phone registry row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneRecord {
    pub phone_number: String,
    pub last_seen: NaiveDateTime,
}

/// Liveness fields reported by accounting
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    pub online: bool,
    pub location: Option<String>,
    pub ipv4: Option<String>,
}

#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn find_by_mac(&self, mac: &str) -> Result<Option<WifiClient>, RepoError>;

    async fn find_by_fingerprint(&self, fingerprint: &str)
        -> Result<Option<WifiClient>, RepoError>;

    /// Insert or refresh the client row for `mac`, linking it to `phone`
    /// (created lazily) and replacing expiration and class. Converges under
    /// concurrent calls for the same MAC.
    async fn create_or_update(
        &self,
        mac: &str,
        employee: bool,
        phone: &str,
        expiration: NaiveDateTime,
    ) -> Result<(), RepoError>;

    async fn update_fingerprint(&self, mac: &str, fingerprint: &str) -> Result<(), RepoError>;

    async fn update_employee_class(&self, mac: &str, employee: bool) -> Result<(), RepoError>;

    async fn update_expiration(
        &self,
        mac: &str,
        expiration: NaiveDateTime,
    ) -> Result<(), RepoError>;

    /// Deauthorize immediately by pushing the expiration back to the epoch
    async fn reset_expiration(&self, mac: &str) -> Result<(), RepoError>;

    /// Best-effort liveness refresh; unknown MACs are a no-op
    async fn update_liveness(&self, mac: &str, liveness: Liveness) -> Result<(), RepoError>;

    /// Idempotent lazy insert of a phone registry record
    async fn get_or_create_phone(&self, phone: &str) -> Result<PhoneRecord, RepoError>;

    /// Refresh `last_seen` on the registry record, creating it if missing
    async fn touch_phone(&self, phone: &str) -> Result<(), RepoError>;

    async fn is_employee_phone(&self, phone: &str) -> Result<bool, RepoError>;

    async fn is_blacklisted(&self, phone: &str) -> Result<bool, RepoError>;

    /// Add to the blacklist; `false` when the phone was already listed
    async fn add_to_blacklist(&self, phone: &str) -> Result<bool, RepoError>;
}
