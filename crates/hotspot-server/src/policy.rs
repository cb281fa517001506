//! Device-class and blacklist policy
//!
//! Employee classification consults the external phonebook first when one
//! is configured; the local employee_phone table is the fallback. Blacklist
//! membership is always local and is checked by every authentication path
//! before any state mutation.

use crate::cache::CacheBackend;
use crate::repo::{IdentityRepository, RepoError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory request failed: {0}")]
    Transport(String),
    #[error("Directory returned status {0}")]
    Status(u16),
}

/// Read-only external employee directory
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// `Some(answer)` when the directory is authoritative for the phone,
    /// `None` when it cannot say
    async fn lookup(&self, phone: &str) -> Result<Option<bool>, DirectoryError>;
}

/// Company phonebook over HTTP: `GET {base}/{phone}` returning
/// `{"employee": bool}`; 404 means "known not to be an employee"
pub struct HttpEmployeeDirectory {
    client: reqwest::Client,
    base_url: String,
}

#[derive(serde::Deserialize)]
struct DirectoryAnswer {
    employee: bool,
}

impl HttpEmployeeDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpEmployeeDirectory {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl EmployeeDirectory for HttpEmployeeDirectory {
    async fn lookup(&self, phone: &str) -> Result<Option<bool>, DirectoryError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), phone);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let answer: DirectoryAnswer = response
                .json()
                .await
                .map_err(|e| DirectoryError::Transport(e.to_string()))?;
            Ok(Some(answer.employee))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            // the phonebook is authoritative: unknown means not an employee
            Ok(Some(false))
        } else {
            Err(DirectoryError::Status(status.as_u16()))
        }
    }
}

/// Policy decisions over repository plus directory
#[derive(Clone)]
pub struct PolicyEngine {
    repo: Arc<dyn IdentityRepository>,
    cache: Arc<dyn CacheBackend>,
    directory: Option<Arc<dyn EmployeeDirectory>>,
    directory_cache_ttl: Duration,
}

impl PolicyEngine {
    pub fn new(
        repo: Arc<dyn IdentityRepository>,
        cache: Arc<dyn CacheBackend>,
        directory: Option<Arc<dyn EmployeeDirectory>>,
        directory_cache_ttl: Duration,
    ) -> Self {
        PolicyEngine {
            repo,
            cache,
            directory,
            directory_cache_ttl,
        }
    }

    /// Employee classification for a phone
    ///
    /// Directory answers are cached under `employee:<phone>`; directory
    /// trouble degrades to the local table rather than failing the login.
    pub async fn is_employee(&self, phone: &str) -> Result<bool, RepoError> {
        if let Some(directory) = &self.directory {
            let key = format!("employee:{}", phone);

            match self.cache.get(&key).await {
                Ok(Some(cached)) => return Ok(cached == b"1"),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Employee cache read failed"),
            }

            match directory.lookup(phone).await {
                Ok(Some(employee)) => {
                    let value: &[u8] = if employee { b"1" } else { b"0" };
                    if let Err(e) = self
                        .cache
                        .set(&key, value, Some(self.directory_cache_ttl))
                        .await
                    {
                        warn!(error = %e, "Employee cache write failed");
                    }
                    return Ok(employee);
                }
                Ok(None) => {
                    debug!(phone = %crate::phone::mask_phone(phone), "Directory had no answer");
                }
                Err(e) => {
                    warn!(error = %e, "Employee directory lookup failed, using local table");
                }
            }
        }

        self.repo.is_employee_phone(phone).await
    }

    pub async fn is_blacklisted(&self, phone: &str) -> Result<bool, RepoError> {
        self.repo.is_blacklisted(phone).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::repo::MemoryIdentityRepository;

    struct FixedDirectory(Option<bool>);

    #[async_trait]
    impl EmployeeDirectory for FixedDirectory {
        async fn lookup(&self, _phone: &str) -> Result<Option<bool>, DirectoryError> {
            Ok(self.0)
        }
    }

    struct BrokenDirectory;

    #[async_trait]
    impl EmployeeDirectory for BrokenDirectory {
        async fn lookup(&self, _phone: &str) -> Result<Option<bool>, DirectoryError> {
            Err(DirectoryError::Transport("unreachable".to_string()))
        }
    }

    fn engine(
        repo: Arc<MemoryIdentityRepository>,
        directory: Option<Arc<dyn EmployeeDirectory>>,
    ) -> PolicyEngine {
        PolicyEngine::new(
            repo,
            Arc::new(MemoryCache::new()),
            directory,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn local_table_without_directory() {
        let repo = Arc::new(MemoryIdentityRepository::new());
        repo.add_employee_phone("79990000001").await;
        let policy = engine(repo, None);

        assert!(policy.is_employee("79990000001").await.unwrap());
        assert!(!policy.is_employee("79990000002").await.unwrap());
    }

    #[tokio::test]
    async fn directory_answer_wins_over_local_table() {
        let repo = Arc::new(MemoryIdentityRepository::new());
        repo.add_employee_phone("79990000001").await;
        // directory says guest even though the local table says employee
        let policy = engine(repo, Some(Arc::new(FixedDirectory(Some(false)))));

        assert!(!policy.is_employee("79990000001").await.unwrap());
    }

    #[tokio::test]
    async fn indeterminate_directory_falls_back() {
        let repo = Arc::new(MemoryIdentityRepository::new());
        repo.add_employee_phone("79990000001").await;
        let policy = engine(repo, Some(Arc::new(FixedDirectory(None))));

        assert!(policy.is_employee("79990000001").await.unwrap());
    }

    #[tokio::test]
    async fn broken_directory_falls_back() {
        let repo = Arc::new(MemoryIdentityRepository::new());
        repo.add_employee_phone("79990000001").await;
        let policy = engine(repo, Some(Arc::new(BrokenDirectory)));

        assert!(policy.is_employee("79990000001").await.unwrap());
    }

    #[tokio::test]
    async fn directory_answer_is_cached() {
        let repo = Arc::new(MemoryIdentityRepository::new());
        let cache = Arc::new(MemoryCache::new());
        let policy = PolicyEngine::new(
            repo.clone(),
            cache.clone(),
            Some(Arc::new(FixedDirectory(Some(true)))),
            Duration::from_secs(60),
        );

        assert!(policy.is_employee("79990000005").await.unwrap());
        assert_eq!(
            cache.get("employee:79990000005").await.unwrap(),
            Some(b"1".to_vec())
        );
    }

    #[tokio::test]
    async fn blacklist_is_always_local() {
        let repo = Arc::new(MemoryIdentityRepository::new());
        repo.add_to_blacklist("79990000009").await.unwrap();
        let policy = engine(repo, Some(Arc::new(FixedDirectory(Some(true)))));

        assert!(policy.is_blacklisted("79990000009").await.unwrap());
        assert!(!policy.is_blacklisted("79990000008").await.unwrap());
    }
}
