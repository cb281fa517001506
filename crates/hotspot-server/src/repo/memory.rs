//! In-memory identity repository
//!
//! Mirrors the Postgres upsert semantics under a single lock. Used by tests
//! and by single-box demo deployments that run without a database.

use super::{IdentityRepository, Liveness, PhoneRecord, RepoError, WifiClient};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    clients: HashMap<String, StoredClient>,
    phones: HashMap<String, NaiveDateTime>,
    employees: HashSet<String>,
    blacklist: HashSet<String>,
}

#[derive(Debug, Clone)]
struct StoredClient {
    expiration: NaiveDateTime,
    employee: bool,
    phone: Option<String>,
    fingerprint: Option<String>,
    liveness: Liveness,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityRepository {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an employee phone association
    pub async fn add_employee_phone(&self, phone: &str) {
        self.inner.write().await.employees.insert(phone.to_string());
    }

    /// Remove an employee phone association
    pub async fn remove_employee_phone(&self, phone: &str) {
        self.inner.write().await.employees.remove(phone);
    }

    /// Liveness fields for a MAC, if the client exists
    pub async fn liveness(&self, mac: &str) -> Option<Liveness> {
        self.inner
            .read()
            .await
            .clients
            .get(mac)
            .map(|c| c.liveness.clone())
    }

    fn to_value(mac: &str, stored: &StoredClient) -> WifiClient {
        WifiClient {
            mac: mac.to_string(),
            expiration: stored.expiration,
            employee: stored.employee,
            phone: stored.phone.clone(),
            fingerprint: stored.fingerprint.clone(),
        }
    }
}

#[async_trait]
impl IdentityRepository for MemoryIdentityRepository {
    async fn find_by_mac(&self, mac: &str) -> Result<Option<WifiClient>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.clients.get(mac).map(|c| Self::to_value(mac, c)))
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<WifiClient>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner
            .clients
            .iter()
            .find(|(_, c)| c.fingerprint.as_deref() == Some(fingerprint))
            .map(|(mac, c)| Self::to_value(mac, c)))
    }

    async fn create_or_update(
        &self,
        mac: &str,
        employee: bool,
        phone: &str,
        expiration: NaiveDateTime,
    ) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;
        inner
            .phones
            .entry(phone.to_string())
            .or_insert_with(|| Local::now().naive_local());

        match inner.clients.get_mut(mac) {
            Some(stored) => {
                stored.expiration = expiration;
                stored.employee = employee;
                stored.phone = Some(phone.to_string());
            }
            None => {
                inner.clients.insert(
                    mac.to_string(),
                    StoredClient {
                        expiration,
                        employee,
                        phone: Some(phone.to_string()),
                        fingerprint: None,
                        liveness: Liveness::default(),
                    },
                );
            }
        }
        Ok(())
    }

    async fn update_fingerprint(&self, mac: &str, fingerprint: &str) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .clients
            .get_mut(mac)
            .ok_or_else(|| RepoError::UnknownClient(mac.to_string()))?;
        stored.fingerprint = Some(fingerprint.to_string());
        Ok(())
    }

    async fn update_employee_class(&self, mac: &str, employee: bool) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .clients
            .get_mut(mac)
            .ok_or_else(|| RepoError::UnknownClient(mac.to_string()))?;
        stored.employee = employee;
        Ok(())
    }

    async fn update_expiration(
        &self,
        mac: &str,
        expiration: NaiveDateTime,
    ) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .clients
            .get_mut(mac)
            .ok_or_else(|| RepoError::UnknownClient(mac.to_string()))?;
        stored.expiration = expiration;
        Ok(())
    }

    async fn reset_expiration(&self, mac: &str) -> Result<(), RepoError> {
        self.update_expiration(mac, crate::expiration::epoch()).await
    }

    async fn update_liveness(&self, mac: &str, liveness: Liveness) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;
        if let Some(stored) = inner.clients.get_mut(mac) {
            stored.liveness = liveness;
        }
        Ok(())
    }

    async fn get_or_create_phone(&self, phone: &str) -> Result<PhoneRecord, RepoError> {
        let mut inner = self.inner.write().await;
        let last_seen = *inner
            .phones
            .entry(phone.to_string())
            .or_insert_with(|| Local::now().naive_local());
        Ok(PhoneRecord {
            phone_number: phone.to_string(),
            last_seen,
        })
    }

    async fn touch_phone(&self, phone: &str) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;
        inner
            .phones
            .insert(phone.to_string(), Local::now().naive_local());
        Ok(())
    }

    async fn is_employee_phone(&self, phone: &str) -> Result<bool, RepoError> {
        Ok(self.inner.read().await.employees.contains(phone))
    }

    async fn is_blacklisted(&self, phone: &str) -> Result<bool, RepoError> {
        Ok(self.inner.read().await.blacklist.contains(phone))
    }

    async fn add_to_blacklist(&self, phone: &str) -> Result<bool, RepoError> {
        Ok(self.inner.write().await.blacklist.insert(phone.to_string()))
    }
}
