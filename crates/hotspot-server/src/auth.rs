//! Authentication orchestrator
//!
//! The three captive-portal entry points plus the admin deauthorization
//! path. Every flow resolves to a closed status enum; transport layers map
//! those to HTTP responses or RADIUS packet codes without ever seeing the
//! storage types.

use crate::cache::CacheError;
use crate::expiration::ExpirationPolicy;
use crate::fingerprint::fingerprint;
use crate::otp::{OtpManager, OtpVerification, MAX_ATTEMPTS};
use crate::phone::{mask_mac, mask_phone, normalize_phone};
use crate::policy::PolicyEngine;
use crate::repo::{IdentityRepository, RepoError};
use chrono::Local;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Payload of a successful authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedClient {
    pub mac: String,
    pub phone: String,
    pub employee: bool,
    pub fingerprint: Option<String>,
}

/// Outcome of the silent MAC re-authentication path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacAuthStatus {
    Ok(AuthorizedClient),
    /// Unknown MAC, no linked phone, or a stale device class
    NotFound,
    Expired,
    Blocked,
}

/// Outcome of the phone fast path (known phone, new or known MAC)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneAuthStatus {
    Ok(AuthorizedClient),
    NotFound,
    Blocked,
}

/// Outcome of an OTP submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeAuthStatus {
    Ok,
    Blocked,
    /// No code cached for the session
    CodeExpired,
    /// Wrong code, retries remain
    BadTry,
    /// Wrong code, attempts exhausted; the session was cleared
    BadCode,
}

/// Outcome of the admin deauthorize-by-MAC action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockByMacStatus {
    Ok,
    NotFound,
    AlreadyBlocked,
}

pub struct AuthEngine {
    repo: Arc<dyn IdentityRepository>,
    policy: PolicyEngine,
    expiration: ExpirationPolicy,
    otp: OtpManager,
}

impl AuthEngine {
    pub fn new(
        repo: Arc<dyn IdentityRepository>,
        policy: PolicyEngine,
        expiration: ExpirationPolicy,
        otp: OtpManager,
    ) -> Self {
        AuthEngine {
            repo,
            policy,
            expiration,
            otp,
        }
    }

    pub fn otp(&self) -> &OtpManager {
        &self.otp
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    /// Silent re-authentication of a device the router already knows
    ///
    /// Only reads state; a stale device class is reported as `NotFound` so
    /// the device is pushed through a fresh phone/code round.
    pub async fn authenticate_by_mac(
        &self,
        mac: &str,
        hardware_fp: Option<&str>,
    ) -> Result<MacAuthStatus, AuthError> {
        let Some(client) = self.repo.find_by_mac(mac).await? else {
            return Ok(MacAuthStatus::NotFound);
        };

        if Local::now().naive_local() > client.expiration {
            info!(mac = %mask_mac(mac), "Access expired");
            return Ok(MacAuthStatus::Expired);
        }

        let Some(phone) = client.phone else {
            warn!(mac = %mask_mac(mac), "Client has no linked phone");
            return Ok(MacAuthStatus::NotFound);
        };

        if self.policy.is_blacklisted(&phone).await? {
            info!(mac = %mask_mac(mac), "Blacklisted device");
            return Ok(MacAuthStatus::Blocked);
        }

        let employee = self.policy.is_employee(&phone).await?;
        if client.employee != employee {
            // class changed since the last grant; force a fresh code round
            debug!(mac = %mask_mac(mac), "Stored device class is stale");
            return Ok(MacAuthStatus::NotFound);
        }

        info!(mac = %mask_mac(mac), "Authenticated by expiration window");
        Ok(MacAuthStatus::Ok(AuthorizedClient {
            fingerprint: fingerprint(&phone, hardware_fp),
            mac: client.mac,
            phone,
            employee,
        }))
    }

    /// Fast path for a phone the store already trusts
    ///
    /// Resolves the client by MAC, or by fingerprint when the MAC is new
    /// (a device roaming in with a randomized MAC). The stored phone must
    /// match the submitted one; on success the class is reconciled and the
    /// expiration refreshed.
    pub async fn authenticate_by_phone(
        &self,
        mac: &str,
        phone: &str,
        hardware_fp: Option<&str>,
    ) -> Result<PhoneAuthStatus, AuthError> {
        let phone = normalize_phone(phone);

        if self.policy.is_blacklisted(&phone).await? {
            info!(mac = %mask_mac(mac), "Blacklisted device");
            return Ok(PhoneAuthStatus::Blocked);
        }

        let user_fp = fingerprint(&phone, hardware_fp);

        let mut via = "phone & mac";
        let mut client = self.repo.find_by_mac(mac).await?;
        if client.is_none() {
            if let Some(fp) = &user_fp {
                client = self.repo.find_by_fingerprint(fp).await?;
                via = "phone & fingerprint";
            }
        }

        let matches = client
            .as_ref()
            .and_then(|c| c.phone.as_ref())
            .is_some_and(|stored| *stored == phone);
        let Some(client) = client.filter(|_| matches) else {
            return Ok(PhoneAuthStatus::NotFound);
        };

        let employee = self.policy.is_employee(&phone).await?;
        if client.employee != employee {
            self.repo.update_employee_class(&client.mac, employee).await?;
        }
        self.repo
            .update_expiration(&client.mac, self.expiration.next_expiration(employee))
            .await?;

        info!(mac = %mask_mac(mac), via = via, "Authenticated");
        Ok(PhoneAuthStatus::Ok(AuthorizedClient {
            mac: client.mac,
            phone,
            employee,
            fingerprint: user_fp,
        }))
    }

    /// OTP submission
    ///
    /// Two wrong tries keep the code alive (`BadTry`); the third burns the
    /// session (`BadCode`) and the caller must restart from phone entry. A
    /// match upserts the client with a fresh expiration.
    pub async fn authenticate_by_code(
        &self,
        session_id: &str,
        mac: &str,
        submitted_code: &str,
        phone: &str,
    ) -> Result<CodeAuthStatus, AuthError> {
        let phone = normalize_phone(phone);

        if self.policy.is_blacklisted(&phone).await? {
            info!(mac = %mask_mac(mac), "Blacklisted device");
            return Ok(CodeAuthStatus::Blocked);
        }

        match self.otp.verify(session_id, submitted_code).await? {
            OtpVerification::Expired => Ok(CodeAuthStatus::CodeExpired),
            OtpVerification::Match => {
                let employee = self.policy.is_employee(&phone).await?;
                self.repo
                    .create_or_update(
                        mac,
                        employee,
                        &phone,
                        self.expiration.next_expiration(employee),
                    )
                    .await?;
                self.otp.clear(session_id).await?;
                debug!(mac = %mask_mac(mac), "Authenticated by code");
                Ok(CodeAuthStatus::Ok)
            }
            OtpVerification::Mismatch => {
                let attempts = self.otp.increment_attempts(session_id).await?;
                if attempts < MAX_ATTEMPTS {
                    Ok(CodeAuthStatus::BadTry)
                } else {
                    self.otp.clear(session_id).await?;
                    info!(phone = %mask_phone(&phone), "Code attempts exhausted");
                    Ok(CodeAuthStatus::BadCode)
                }
            }
        }
    }

    /// Admin action: blacklist the phone behind a MAC and cut its access
    /// immediately
    pub async fn block_by_mac(&self, mac: &str) -> Result<BlockByMacStatus, AuthError> {
        let Some(client) = self.repo.find_by_mac(mac).await? else {
            return Ok(BlockByMacStatus::NotFound);
        };
        let Some(phone) = client.phone else {
            return Ok(BlockByMacStatus::NotFound);
        };

        if !self.repo.add_to_blacklist(&phone).await? {
            return Ok(BlockByMacStatus::AlreadyBlocked);
        }

        self.repo.reset_expiration(mac).await?;
        info!(mac = %mask_mac(mac), "Deauthorized and blacklisted");
        Ok(BlockByMacStatus::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::expiration::epoch;
    use crate::repo::MemoryIdentityRepository;
    use crate::sms::DebugSender;
    use chrono::TimeDelta;
    use std::time::Duration;

    const MAC: &str = "AA:BB:CC:DD:EE:FF";
    const PHONE: &str = "79991234567";

    struct Harness {
        engine: AuthEngine,
        repo: Arc<MemoryIdentityRepository>,
        otp: OtpManager,
    }

    fn harness() -> Harness {
        let repo = Arc::new(MemoryIdentityRepository::new());
        let cache = Arc::new(MemoryCache::new());
        let policy = PolicyEngine::new(repo.clone(), cache.clone(), None, Duration::from_secs(60));
        let otp = OtpManager::new(cache, Arc::new(DebugSender));
        let engine = AuthEngine::new(
            repo.clone(),
            policy,
            ExpirationPolicy::new(TimeDelta::days(1), TimeDelta::days(30)),
            otp.clone(),
        );
        Harness { engine, repo, otp }
    }

    fn future() -> chrono::NaiveDateTime {
        Local::now().naive_local() + TimeDelta::days(7)
    }

    #[tokio::test]
    async fn unknown_mac_not_found() {
        let h = harness();
        assert_eq!(
            h.engine.authenticate_by_mac(MAC, None).await.unwrap(),
            MacAuthStatus::NotFound
        );
    }

    #[tokio::test]
    async fn epoch_expiration_is_expired() {
        let h = harness();
        h.repo.add_employee_phone(PHONE).await;
        h.repo.create_or_update(MAC, true, PHONE, epoch()).await.unwrap();

        assert_eq!(
            h.engine.authenticate_by_mac(MAC, None).await.unwrap(),
            MacAuthStatus::Expired
        );
    }

    #[tokio::test]
    async fn blacklisted_phone_is_blocked() {
        let h = harness();
        let granted_until = future();
        h.repo.create_or_update(MAC, false, PHONE, granted_until).await.unwrap();
        h.repo.add_to_blacklist(PHONE).await.unwrap();

        assert_eq!(
            h.engine.authenticate_by_mac(MAC, None).await.unwrap(),
            MacAuthStatus::Blocked
        );
        assert_eq!(
            h.engine.authenticate_by_phone(MAC, PHONE, None).await.unwrap(),
            PhoneAuthStatus::Blocked
        );
        assert_eq!(
            h.engine
                .authenticate_by_code("s1", MAC, "0000", PHONE)
                .await
                .unwrap(),
            CodeAuthStatus::Blocked
        );

        // blocked before any mutation: the stored expiration is untouched
        let client = h.repo.find_by_mac(MAC).await.unwrap().unwrap();
        assert_eq!(client.expiration, granted_until);
    }

    #[tokio::test]
    async fn stale_employee_class_forces_reauth() {
        let h = harness();
        // stored as employee, but the phone is no longer in the table
        h.repo.create_or_update(MAC, true, PHONE, future()).await.unwrap();

        assert_eq!(
            h.engine.authenticate_by_mac(MAC, None).await.unwrap(),
            MacAuthStatus::NotFound
        );
    }

    #[tokio::test]
    async fn valid_client_authenticates_with_fingerprint() {
        let h = harness();
        h.repo.create_or_update(MAC, false, PHONE, future()).await.unwrap();

        match h
            .engine
            .authenticate_by_mac(MAC, Some("0123456789abcdef"))
            .await
            .unwrap()
        {
            MacAuthStatus::Ok(client) => {
                assert_eq!(client.mac, MAC);
                assert_eq!(client.phone, PHONE);
                assert!(!client.employee);
                assert!(client.fingerprint.is_some());
            }
            other => panic!("expected Ok, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn phone_auth_refreshes_expiration_and_class() {
        let h = harness();
        let stale = Local::now().naive_local() + TimeDelta::minutes(5);
        h.repo.create_or_update(MAC, false, PHONE, stale).await.unwrap();
        h.repo.add_employee_phone(PHONE).await;

        match h.engine.authenticate_by_phone(MAC, PHONE, None).await.unwrap() {
            PhoneAuthStatus::Ok(client) => assert!(client.employee),
            other => panic!("expected Ok, got {:?}", other),
        }

        let stored = h.repo.find_by_mac(MAC).await.unwrap().unwrap();
        assert!(stored.employee);
        assert!(stored.expiration > stale);
    }

    #[tokio::test]
    async fn phone_auth_normalizes_input() {
        let h = harness();
        h.repo.create_or_update(MAC, false, PHONE, future()).await.unwrap();

        assert!(matches!(
            h.engine
                .authenticate_by_phone(MAC, "8 (999) 123-45-67", None)
                .await
                .unwrap(),
            PhoneAuthStatus::Ok(_)
        ));
    }

    #[tokio::test]
    async fn phone_auth_roams_by_fingerprint() {
        let h = harness();
        let old_mac = "11:22:33:44:55:66";
        h.repo.create_or_update(old_mac, false, PHONE, future()).await.unwrap();
        let fp = fingerprint(PHONE, Some("hw-serial")).unwrap();
        h.repo.update_fingerprint(old_mac, &fp).await.unwrap();

        // same device, new randomized MAC
        match h
            .engine
            .authenticate_by_phone(MAC, PHONE, Some("hw-serial"))
            .await
            .unwrap()
        {
            PhoneAuthStatus::Ok(client) => assert_eq!(client.mac, old_mac),
            other => panic!("expected Ok, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn phone_mismatch_not_found() {
        let h = harness();
        h.repo.create_or_update(MAC, false, PHONE, future()).await.unwrap();

        assert_eq!(
            h.engine
                .authenticate_by_phone(MAC, "79990000000", None)
                .await
                .unwrap(),
            PhoneAuthStatus::NotFound
        );
    }

    #[tokio::test]
    async fn code_flow_creates_client() {
        let h = harness();
        let code = h.otp.generate("s1").await.unwrap();

        assert_eq!(
            h.engine
                .authenticate_by_code("s1", MAC, &code, PHONE)
                .await
                .unwrap(),
            CodeAuthStatus::Ok
        );

        let client = h.repo.find_by_mac(MAC).await.unwrap().unwrap();
        assert_eq!(client.phone.as_deref(), Some(PHONE));
        assert!(client.expiration > Local::now().naive_local());
    }

    #[tokio::test]
    async fn two_bad_tries_then_bad_code_then_expired() {
        let h = harness();
        let code = h.otp.generate("s1").await.unwrap();
        let wrong = if code == "0000" { "1111" } else { "0000" };

        assert_eq!(
            h.engine.authenticate_by_code("s1", MAC, wrong, PHONE).await.unwrap(),
            CodeAuthStatus::BadTry
        );
        assert_eq!(
            h.engine.authenticate_by_code("s1", MAC, wrong, PHONE).await.unwrap(),
            CodeAuthStatus::BadTry
        );
        assert_eq!(
            h.engine.authenticate_by_code("s1", MAC, wrong, PHONE).await.unwrap(),
            CodeAuthStatus::BadCode
        );
        // the session was cleared, a stale retry reads as expired
        assert_eq!(
            h.engine.authenticate_by_code("s1", MAC, &code, PHONE).await.unwrap(),
            CodeAuthStatus::CodeExpired
        );
        // and no client row was created along the way
        assert!(h.repo.find_by_mac(MAC).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn block_by_mac_blacklists_and_deauthorizes() {
        let h = harness();
        h.repo.create_or_update(MAC, false, PHONE, future()).await.unwrap();

        assert_eq!(h.engine.block_by_mac(MAC).await.unwrap(), BlockByMacStatus::Ok);
        assert!(h.repo.is_blacklisted(PHONE).await.unwrap());
        let client = h.repo.find_by_mac(MAC).await.unwrap().unwrap();
        assert_eq!(client.expiration, epoch());

        assert_eq!(
            h.engine.block_by_mac(MAC).await.unwrap(),
            BlockByMacStatus::AlreadyBlocked
        );
        assert_eq!(
            h.engine.block_by_mac("00:00:00:00:00:00").await.unwrap(),
            BlockByMacStatus::NotFound
        );
    }
}
