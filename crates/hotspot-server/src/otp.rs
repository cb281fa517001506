//! SMS one-time-code manager
//!
//! All state lives in the cache with explicit TTLs; the relational store
//! never sees codes. Per session: the code itself, a wrong-attempt counter,
//! and a resend-cooldown flag.

use crate::cache::{CacheBackend, CacheError};
use crate::sms::SmsSender;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Code and attempt-counter lifetime
pub const CODE_TTL: Duration = Duration::from_secs(300);
/// Resend throttle window
pub const RESEND_COOLDOWN: Duration = Duration::from_secs(60);
/// Wrong submissions allowed before the code is burned
pub const MAX_ATTEMPTS: i64 = 3;

/// Result of checking a submitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpVerification {
    /// Submitted code matches the cached one
    Match,
    /// A code is cached but the submission differs
    Mismatch,
    /// No code cached (never sent, expired, or already cleared)
    Expired,
}

/// Result of the send/resend flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendCodeStatus {
    Sent,
    /// The resend cooldown is still running
    AlreadySent,
    /// The SMS gateway failed; the cooldown is left unarmed so the user
    /// can retry immediately
    SenderError,
}

#[derive(Clone)]
pub struct OtpManager {
    cache: Arc<dyn CacheBackend>,
    sender: Arc<dyn SmsSender>,
}

impl OtpManager {
    pub fn new(cache: Arc<dyn CacheBackend>, sender: Arc<dyn SmsSender>) -> Self {
        OtpManager { cache, sender }
    }

    fn code_key(session_id: &str) -> String {
        format!("sms:code:{}", session_id)
    }

    fn attempts_key(session_id: &str) -> String {
        format!("sms:attempts:{}", session_id)
    }

    fn sent_key(session_id: &str) -> String {
        format!("sms:sended:{}", session_id)
    }

    /// Generate and cache a fresh 4-digit code, resetting the attempt
    /// counter
    pub async fn generate(&self, session_id: &str) -> Result<String, CacheError> {
        let code = format!("{:04}", rand::rng().random_range(0..10_000));

        self.cache
            .set(&Self::code_key(session_id), code.as_bytes(), Some(CODE_TTL))
            .await?;
        self.cache
            .set(&Self::attempts_key(session_id), b"0", Some(CODE_TTL))
            .await?;
        Ok(code)
    }

    /// The cached code, if it has not expired
    pub async fn cached_code(&self, session_id: &str) -> Result<Option<String>, CacheError> {
        self.cache.get_string(&Self::code_key(session_id)).await
    }

    /// Check a submitted code; does not mutate any state
    pub async fn verify(
        &self,
        session_id: &str,
        submitted: &str,
    ) -> Result<OtpVerification, CacheError> {
        match self.cached_code(session_id).await? {
            Some(code) if code == submitted => Ok(OtpVerification::Match),
            Some(_) => Ok(OtpVerification::Mismatch),
            None => Ok(OtpVerification::Expired),
        }
    }

    /// Bump the wrong-attempt counter, returning the new count
    pub async fn increment_attempts(&self, session_id: &str) -> Result<i64, CacheError> {
        self.cache.incr(&Self::attempts_key(session_id)).await
    }

    /// Drop code, counter, and cooldown together (success or final failure)
    pub async fn clear(&self, session_id: &str) -> Result<(), CacheError> {
        self.cache.delete(&Self::code_key(session_id)).await?;
        self.cache.delete(&Self::attempts_key(session_id)).await?;
        self.cache.delete(&Self::sent_key(session_id)).await?;
        Ok(())
    }

    /// Send (or resend) the code for a session
    ///
    /// A still-cached code is reused rather than regenerated, so a resend
    /// inside the code's lifetime keeps earlier SMS deliveries valid.
    pub async fn send_code(
        &self,
        session_id: &str,
        phone: &str,
    ) -> Result<SendCodeStatus, CacheError> {
        if self.cache.get(&Self::sent_key(session_id)).await?.is_some() {
            return Ok(SendCodeStatus::AlreadySent);
        }

        let code = match self.cached_code(session_id).await? {
            Some(code) => {
                debug!(session = %session_id, "Reusing cached code");
                code
            }
            None => self.generate(session_id).await?,
        };

        let message = format!("Wi-Fi access code: {}", code);
        if let Err(e) = self.sender.send(phone, &message).await {
            error!(
                phone = %crate::phone::mask_phone(phone),
                error = %e,
                "Failed to send SMS"
            );
            return Ok(SendCodeStatus::SenderError);
        }

        self.cache
            .set(&Self::sent_key(session_id), b"1", Some(RESEND_COOLDOWN))
            .await?;
        debug!(
            phone = %crate::phone::mask_phone(phone),
            session = %session_id,
            "Sent access code"
        );
        Ok(SendCodeStatus::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::sms::{DebugSender, SmsError};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct RecordingSender {
        messages: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingSender {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(RecordingSender {
                messages: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl SmsSender for RecordingSender {
        async fn send(&self, _recipient: &str, message: &str) -> Result<(), SmsError> {
            if self.fail {
                return Err(SmsError::Gateway("down".to_string()));
            }
            self.messages.lock().await.push(message.to_string());
            Ok(())
        }
    }

    fn manager() -> OtpManager {
        OtpManager::new(Arc::new(MemoryCache::new()), Arc::new(DebugSender))
    }

    #[tokio::test]
    async fn generated_code_is_four_digits() {
        let otp = manager();
        let code = otp.generate("s1").await.unwrap();
        assert_eq!(code.len(), 4);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn verify_match_mismatch_expired() {
        let otp = manager();
        let code = otp.generate("s1").await.unwrap();

        assert_eq!(otp.verify("s1", &code).await.unwrap(), OtpVerification::Match);
        assert_eq!(otp.verify("s1", "xxxx").await.unwrap(), OtpVerification::Mismatch);
        assert_eq!(otp.verify("s2", &code).await.unwrap(), OtpVerification::Expired);
    }

    #[tokio::test]
    async fn clear_expires_the_session() {
        let otp = manager();
        let code = otp.generate("s1").await.unwrap();
        otp.increment_attempts("s1").await.unwrap();

        otp.clear("s1").await.unwrap();
        assert_eq!(otp.verify("s1", &code).await.unwrap(), OtpVerification::Expired);
        // cleared counter restarts from scratch
        assert_eq!(otp.increment_attempts("s1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn attempts_count_up() {
        let otp = manager();
        otp.generate("s1").await.unwrap();
        assert_eq!(otp.increment_attempts("s1").await.unwrap(), 1);
        assert_eq!(otp.increment_attempts("s1").await.unwrap(), 2);
        assert_eq!(otp.increment_attempts("s1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn send_then_resend_hits_cooldown() {
        let cache = Arc::new(MemoryCache::new());
        let sender = RecordingSender::new(false);
        let otp = OtpManager::new(cache, sender.clone());

        assert_eq!(otp.send_code("s1", "79991234567").await.unwrap(), SendCodeStatus::Sent);
        assert_eq!(
            otp.send_code("s1", "79991234567").await.unwrap(),
            SendCodeStatus::AlreadySent
        );
        assert_eq!(sender.messages.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn resend_after_cooldown_reuses_code() {
        let cache = Arc::new(MemoryCache::new());
        let sender = RecordingSender::new(false);
        let otp = OtpManager::new(cache.clone(), sender.clone());

        otp.send_code("s1", "79991234567").await.unwrap();
        let code = otp.cached_code("s1").await.unwrap().unwrap();

        // cooldown elapses, code is still cached
        cache.delete("sms:sended:s1").await.unwrap();
        assert_eq!(otp.send_code("s1", "79991234567").await.unwrap(), SendCodeStatus::Sent);

        let messages = sender.messages.lock().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], messages[1]);
        assert!(messages[1].contains(&code));
    }

    #[tokio::test]
    async fn sender_failure_leaves_cooldown_unarmed() {
        let otp = OtpManager::new(Arc::new(MemoryCache::new()), RecordingSender::new(true));

        assert_eq!(
            otp.send_code("s1", "79991234567").await.unwrap(),
            SendCodeStatus::SenderError
        );
        // an immediate retry is not throttled
        assert_ne!(
            otp.send_code("s1", "79991234567").await.unwrap(),
            SendCodeStatus::AlreadySent
        );
    }
}
