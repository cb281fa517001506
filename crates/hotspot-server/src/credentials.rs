//! Credential issuance for the walled-garden login
//!
//! After a successful authentication the device still has to log in to the
//! router. With RADIUS enabled the router checks that login against us, so
//! we mint a short-lived per-phone token; without RADIUS the router holds
//! two static accounts and we hand out the right one per class.

use crate::cache::{CacheBackend, CacheError};
use crate::policy::PolicyEngine;
use crate::repo::{IdentityRepository, RepoError};
use hotspot_proto::chap::portal_chap_hash;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// CHAP context the router attached to its redirect, octal-escaped
#[derive(Debug, Clone)]
pub struct ChapBinding {
    pub chap_id: String,
    pub chap_challenge: String,
}

/// What the device submits to the router's login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredentials {
    pub username: String,
    pub password: String,
    /// Router login URL, scheme-downgraded when CHAP is in play
    pub login_url: Option<String>,
}

pub struct CredentialIssuer {
    cache: Arc<dyn CacheBackend>,
    repo: Arc<dyn IdentityRepository>,
    policy: PolicyEngine,
    radius_enabled: bool,
    guest_password: String,
    staff_password: String,
    token_ttl: Duration,
}

impl CredentialIssuer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Arc<dyn CacheBackend>,
        repo: Arc<dyn IdentityRepository>,
        policy: PolicyEngine,
        radius_enabled: bool,
        guest_password: impl Into<String>,
        staff_password: impl Into<String>,
        token_ttl: Duration,
    ) -> Self {
        CredentialIssuer {
            cache,
            repo,
            policy,
            radius_enabled,
            guest_password: guest_password.into(),
            staff_password: staff_password.into(),
            token_ttl,
        }
    }

    pub fn token_key(phone: &str) -> String {
        format!("auth:token:{}", phone)
    }

    /// Mint credentials for an authenticated device
    ///
    /// Side effects: persists the fingerprint when one was derived, caches
    /// the per-phone token in RADIUS mode, and refreshes the phone
    /// registry's last-seen stamp.
    pub async fn issue(
        &self,
        mac: &str,
        phone: &str,
        fingerprint: Option<&str>,
        chap: Option<&ChapBinding>,
        login_url: Option<&str>,
    ) -> Result<IssuedCredentials, CredentialError> {
        let (username, mut password) = if self.radius_enabled {
            let token: [u8; 32] = rand::rng().random();
            let token = hex::encode(token);
            self.cache
                .set(
                    &Self::token_key(phone),
                    token.as_bytes(),
                    Some(self.token_ttl),
                )
                .await?;
            (phone.to_string(), token)
        } else {
            let employee = self.policy.is_employee(phone).await?;
            if employee {
                ("employee".to_string(), self.staff_password.clone())
            } else {
                ("guest".to_string(), self.guest_password.clone())
            }
        };

        // CHAP login only works over plain HTTP on the router's hotspot
        // page, so the redirect scheme drops with the password rewrite.
        let mut login_url = login_url.map(str::to_string);
        if let Some(chap) = chap {
            password = portal_chap_hash(&chap.chap_id, &password, &chap.chap_challenge);
            login_url = login_url.map(|url| url.replacen("https://", "http://", 1));
        }

        if let Some(fingerprint) = fingerprint {
            self.repo.update_fingerprint(mac, fingerprint).await?;
        }

        self.repo.touch_phone(phone).await?;

        debug!(
            mac = %crate::phone::mask_mac(mac),
            phone = %crate::phone::mask_phone(phone),
            username = %username,
            "Issued walled-garden credentials"
        );

        Ok(IssuedCredentials {
            username,
            password,
            login_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::repo::MemoryIdentityRepository;
    use chrono::NaiveDate;

    const MAC: &str = "AA:BB:CC:00:00:01";
    const PHONE: &str = "79991234567";

    async fn issuer(radius_enabled: bool) -> (CredentialIssuer, Arc<MemoryCache>, Arc<MemoryIdentityRepository>) {
        let cache = Arc::new(MemoryCache::new());
        let repo = Arc::new(MemoryIdentityRepository::new());
        repo.create_or_update(
            MAC,
            false,
            PHONE,
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap().and_hms_opt(6, 0, 0).unwrap(),
        )
        .await
        .unwrap();

        let policy = PolicyEngine::new(repo.clone(), cache.clone(), None, Duration::from_secs(60));
        let issuer = CredentialIssuer::new(
            cache.clone(),
            repo.clone(),
            policy,
            radius_enabled,
            "guest-pass",
            "staff-pass",
            Duration::from_secs(300),
        );
        (issuer, cache, repo)
    }

    #[tokio::test]
    async fn static_guest_credentials() {
        let (issuer, _, _) = issuer(false).await;
        let creds = issuer.issue(MAC, PHONE, None, None, None).await.unwrap();
        assert_eq!(creds.username, "guest");
        assert_eq!(creds.password, "guest-pass");
        assert_eq!(creds.login_url, None);
    }

    #[tokio::test]
    async fn static_staff_credentials() {
        let (issuer, _, repo) = issuer(false).await;
        repo.add_employee_phone(PHONE).await;

        let creds = issuer.issue(MAC, PHONE, None, None, None).await.unwrap();
        assert_eq!(creds.username, "employee");
        assert_eq!(creds.password, "staff-pass");
    }

    #[tokio::test]
    async fn radius_mode_caches_token() {
        let (issuer, cache, _) = issuer(true).await;
        let creds = issuer.issue(MAC, PHONE, None, None, None).await.unwrap();

        assert_eq!(creds.username, PHONE);
        assert_eq!(creds.password.len(), 64);
        let cached = cache
            .get_string(&CredentialIssuer::token_key(PHONE))
            .await
            .unwrap();
        assert_eq!(cached.as_deref(), Some(creds.password.as_str()));
    }

    #[tokio::test]
    async fn chap_rewrites_password_and_downgrades_url() {
        let (issuer, _, _) = issuer(false).await;
        let chap = ChapBinding {
            chap_id: r"\000".to_string(),
            chap_challenge: r"\141\142\143".to_string(),
        };

        let creds = issuer
            .issue(MAC, PHONE, None, Some(&chap), Some("https://login.hotspot/login"))
            .await
            .unwrap();

        assert_eq!(creds.password, portal_chap_hash(r"\000", "guest-pass", r"\141\142\143"));
        assert_eq!(creds.login_url.as_deref(), Some("http://login.hotspot/login"));
    }

    #[tokio::test]
    async fn fingerprint_is_persisted() {
        let (issuer, _, repo) = issuer(false).await;
        issuer
            .issue(MAC, PHONE, Some("fp-hash"), None, None)
            .await
            .unwrap();

        let client = repo.find_by_mac(MAC).await.unwrap().unwrap();
        assert_eq!(client.fingerprint.as_deref(), Some("fp-hash"));
    }
}
