//! SMS sender contract
//!
//! The engine only depends on `send(recipient, message)`; which gateway
//! actually delivers the message is deployment configuration.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SmsError {
    #[error("Gateway error: {0}")]
    Gateway(String),
    #[error("Gateway rejected message: status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SmsError>;
}

/// Logs instead of sending; the default in development
#[derive(Debug, Default)]
pub struct DebugSender;

#[async_trait]
impl SmsSender for DebugSender {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SmsError> {
        info!(
            recipient = %crate::phone::mask_phone(recipient),
            message = %message,
            "Debug SMS sender"
        );
        Ok(())
    }
}

/// Generic HTTP SMS gateway: POSTs `{"to": ..., "text": ...}` with an
/// optional bearer key and treats any non-2xx as a failed send
pub struct HttpSmsSender {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpSmsSender {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        HttpSmsSender {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SmsError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "to": recipient, "text": message }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SmsError::Gateway(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SmsError::Rejected(response.status().as_u16()));
        }

        debug!(recipient = %crate::phone::mask_phone(recipient), "SMS handed to gateway");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn debug_sender_always_succeeds() {
        DebugSender.send("79991234567", "code 0042").await.unwrap();
    }

    #[tokio::test]
    async fn http_sender_reports_unreachable_gateway() {
        // Port 9 on localhost is expected to refuse connections.
        let sender = HttpSmsSender::new("http://127.0.0.1:9/send", None);
        assert!(sender.send("79991234567", "code").await.is_err());
    }
}
