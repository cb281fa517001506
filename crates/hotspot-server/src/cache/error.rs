use thiserror::Error;

/// Errors from cache backend operations
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() {
            CacheError::Connection(err.to_string())
        } else if err.is_timeout() {
            CacheError::Timeout(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}
