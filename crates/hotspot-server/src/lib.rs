//! Hotspot authentication engine and RADIUS AAA server
//!
//! The captive portal calls the library surface: the [`auth::AuthEngine`]
//! entry points, [`otp::OtpManager::send_code`] for the SMS round, and
//! [`credentials::CredentialIssuer::issue`] once a flow lands on success.
//! The network equipment talks to the same engine over UDP through
//! [`server::RadiusServer`].
//!
//! # Example
//!
//! ```rust,no_run
//! use hotspot_server::auth::{AuthEngine, MacAuthStatus};
//! use hotspot_server::cache::MemoryCache;
//! use hotspot_server::expiration::ExpirationPolicy;
//! use hotspot_server::otp::OtpManager;
//! use hotspot_server::policy::PolicyEngine;
//! use hotspot_server::repo::MemoryIdentityRepository;
//! use hotspot_server::sms::DebugSender;
//! use chrono::TimeDelta;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let repo = Arc::new(MemoryIdentityRepository::new());
//! let cache = Arc::new(MemoryCache::new());
//! let policy = PolicyEngine::new(repo.clone(), cache.clone(), None, Duration::from_secs(300));
//! let otp = OtpManager::new(cache, Arc::new(DebugSender));
//! let engine = AuthEngine::new(
//!     repo,
//!     policy,
//!     ExpirationPolicy::new(TimeDelta::days(1), TimeDelta::days(30)),
//!     otp,
//! );
//!
//! match engine.authenticate_by_mac("AA:BB:CC:DD:EE:FF", None).await.unwrap() {
//!     MacAuthStatus::Ok(client) => println!("welcome back {}", client.phone),
//!     status => println!("needs a fresh login: {:?}", status),
//! }
//! # }
//! ```

pub mod accounting;
pub mod admin;
pub mod auth;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod expiration;
pub mod fingerprint;
pub mod otp;
pub mod phone;
pub mod policy;
pub mod repo;
pub mod server;
pub mod sms;

pub use auth::{AuthEngine, AuthorizedClient, CodeAuthStatus, MacAuthStatus, PhoneAuthStatus};
pub use cache::{CacheBackend, CacheError, MemoryCache, ValkeyCache};
pub use config::{Config, ConfigError};
pub use credentials::{ChapBinding, CredentialIssuer, IssuedCredentials};
pub use expiration::ExpirationPolicy;
pub use otp::{OtpManager, OtpVerification, SendCodeStatus};
pub use policy::{EmployeeDirectory, PolicyEngine};
pub use repo::{IdentityRepository, MemoryIdentityRepository, PgIdentityRepository};
pub use server::{RadiusServer, ServerContext, ServerError};
