//! Operator login guard
//!
//! A cache-backed brute-force counter: the same pattern as the OTP attempt
//! counter, but keyed per admin session and armed with a lockout-until
//! timestamp once the attempt budget is spent.

use crate::cache::{CacheBackend, CacheError};
use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of an operator login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminLoginStatus {
    Ok,
    /// The session is locked out; no credential check was performed
    Lockout,
    BadLogin,
}

pub struct AdminGuard {
    cache: Arc<dyn CacheBackend>,
    username: String,
    password_hash: String,
    max_attempts: i64,
    lockout: Duration,
}

impl AdminGuard {
    pub fn new(
        cache: Arc<dyn CacheBackend>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
        max_attempts: i64,
        lockout: Duration,
    ) -> Self {
        AdminGuard {
            cache,
            username: username.into(),
            password_hash: password_hash.into(),
            max_attempts,
            lockout,
        }
    }

    fn attempts_key(session_id: &str) -> String {
        format!("admin:login:attempts:{}", session_id)
    }

    fn lockout_key(session_id: &str) -> String {
        format!("admin:login:lockout:{}", session_id)
    }

    /// Whether a future lockout timestamp is cached for the session
    pub async fn check_lockout(&self, session_id: &str) -> Result<bool, CacheError> {
        let Some(until) = self
            .cache
            .get_string(&Self::lockout_key(session_id))
            .await?
        else {
            return Ok(false);
        };
        Ok(until
            .parse::<i64>()
            .map(|ts| Utc::now().timestamp() < ts)
            .unwrap_or(false))
    }

    pub async fn increment_attempts(&self, session_id: &str) -> Result<i64, CacheError> {
        self.cache.incr(&Self::attempts_key(session_id)).await
    }

    pub async fn reset_attempts(&self, session_id: &str) -> Result<(), CacheError> {
        self.cache.delete(&Self::attempts_key(session_id)).await?;
        self.cache.delete(&Self::lockout_key(session_id)).await?;
        Ok(())
    }

    /// Arm the lockout: cache `now + lockout` under the session with the
    /// same TTL, so it disappears exactly when it stops applying
    pub async fn update_lockout(&self, session_id: &str) -> Result<(), CacheError> {
        let until = Utc::now()
            + TimeDelta::seconds(self.lockout.as_secs().min(i64::MAX as u64) as i64);
        self.cache
            .set(
                &Self::lockout_key(session_id),
                until.timestamp().to_string().as_bytes(),
                Some(self.lockout),
            )
            .await
    }

    async fn verify_password(&self, password: &str) -> bool {
        if self.password_hash.is_empty() {
            return false;
        }
        let password = password.to_string();
        let hash = self.password_hash.clone();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
            .await
            .unwrap_or(false)
    }

    /// Operator login: lockout check, bcrypt verification, counter upkeep
    pub async fn login(
        &self,
        session_id: &str,
        username: &str,
        password: &str,
    ) -> Result<AdminLoginStatus, CacheError> {
        if self.check_lockout(session_id).await? {
            info!(session = %session_id, "Login attempt during lockout");
            return Ok(AdminLoginStatus::Lockout);
        }

        if username == self.username && self.verify_password(password).await {
            self.reset_attempts(session_id).await?;
            info!(username = %username, "Operator logged in");
            return Ok(AdminLoginStatus::Ok);
        }

        let attempts = self.increment_attempts(session_id).await?;
        if attempts >= self.max_attempts {
            self.update_lockout(session_id).await?;
            warn!(session = %session_id, attempts = attempts, "Operator login locked out");
        }
        Ok(AdminLoginStatus::BadLogin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn guard(max_attempts: i64) -> AdminGuard {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        AdminGuard::new(
            Arc::new(MemoryCache::new()),
            "admin",
            hash,
            max_attempts,
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn correct_credentials_log_in() {
        let guard = guard(3);
        assert_eq!(
            guard.login("s1", "admin", "hunter2").await.unwrap(),
            AdminLoginStatus::Ok
        );
    }

    #[tokio::test]
    async fn wrong_password_is_bad_login() {
        let guard = guard(3);
        assert_eq!(
            guard.login("s1", "admin", "wrong").await.unwrap(),
            AdminLoginStatus::BadLogin
        );
        assert_eq!(
            guard.login("s1", "intruder", "hunter2").await.unwrap(),
            AdminLoginStatus::BadLogin
        );
    }

    #[tokio::test]
    async fn lockout_after_max_attempts() {
        let guard = guard(3);
        for _ in 0..3 {
            assert_eq!(
                guard.login("s1", "admin", "wrong").await.unwrap(),
                AdminLoginStatus::BadLogin
            );
        }
        // even the right password bounces now
        assert_eq!(
            guard.login("s1", "admin", "hunter2").await.unwrap(),
            AdminLoginStatus::Lockout
        );
        // other sessions are unaffected
        assert_eq!(
            guard.login("s2", "admin", "hunter2").await.unwrap(),
            AdminLoginStatus::Ok
        );
    }

    #[tokio::test]
    async fn success_resets_the_counter() {
        let guard = guard(3);
        guard.login("s1", "admin", "wrong").await.unwrap();
        guard.login("s1", "admin", "wrong").await.unwrap();
        assert_eq!(
            guard.login("s1", "admin", "hunter2").await.unwrap(),
            AdminLoginStatus::Ok
        );
        // the budget is whole again
        for _ in 0..2 {
            guard.login("s1", "admin", "wrong").await.unwrap();
        }
        assert_eq!(
            guard.login("s1", "admin", "hunter2").await.unwrap(),
            AdminLoginStatus::Ok
        );
    }

    #[tokio::test]
    async fn empty_hash_disables_login() {
        let guard = AdminGuard::new(
            Arc::new(MemoryCache::new()),
            "admin",
            "",
            3,
            Duration::from_secs(300),
        );
        assert_eq!(
            guard.login("s1", "admin", "anything").await.unwrap(),
            AdminLoginStatus::BadLogin
        );
    }
}
