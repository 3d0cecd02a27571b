//! Outbound notifications.
//!
//! The ledger hands a [`Notification`] to a [`Notifier`] after a batch has
//! committed. Delivery failures are reported to the caller but never affect
//! ledger state.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::SmsConfig;

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The gateway rejected our credentials.
    #[error("SMS gateway authentication failed: {0}")]
    Auth(String),
    /// Failed to reach the gateway or read its reply.
    #[error("SMS gateway request failed: {0}")]
    Transport(String),
    /// The gateway answered with a non-success status.
    #[error("SMS gateway rejected message with status {0}")]
    Rejected(u16),
    /// No recipient on the notification.
    #[error("Notification has no recipient")]
    NoRecipient,
}

/// A message addressed to a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Recipient phone number.
    pub to: String,
    /// Message text.
    pub body: String,
}

/// Delivers notifications to customers.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notification.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    account_code: &'a str,
    to: &'a str,
    transaction_id: String,
    text: &'a str,
}

/// HTTP SMS gateway client.
///
/// Owns its bearer token: the first send logs in (unless a token was
/// configured), later sends reuse it, and a 401 clears it and logs in again
/// once.
pub struct SmsClient {
    config: SmsConfig,
    http: reqwest::Client,
    token: RwLock<Option<String>>,
}

impl SmsClient {
    /// Creates a new SMS client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: SmsConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        let token = config.auth_token.clone().filter(|t| !t.is_empty());

        Ok(Self {
            config,
            http,
            token: RwLock::new(token),
        })
    }

    /// Returns the cached token, if any.
    pub async fn cached_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Drops the cached token so the next send logs in again.
    pub async fn invalidate_token(&self) {
        self.token.write().await.take();
    }

    async fn token(&self) -> Result<String, NotifyError> {
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let mut slot = self.token.write().await;
        // Another sender may have logged in while we waited for the lock.
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let response = self
            .http
            .post(&self.config.auth_url)
            .json(&LoginRequest {
                email: &self.config.auth_email,
                password: &self.config.auth_password,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Auth(format!(
                "login returned {}",
                response.status()
            )));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Auth(e.to_string()))?;
        *slot = Some(login.token.clone());
        tracing::debug!("SMS gateway token refreshed");

        Ok(login.token)
    }

    async fn post_message(
        &self,
        token: &str,
        notification: &Notification,
    ) -> Result<StatusCode, NotifyError> {
        let request = SendRequest {
            account_code: &self.config.account_code,
            to: &notification.to,
            transaction_id: uuid::Uuid::new_v4().simple().to_string(),
            text: &notification.body,
        };

        let response = self
            .http
            .post(&self.config.send_url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(response.status())
    }
}

#[async_trait]
impl Notifier for SmsClient {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if notification.to.trim().is_empty() {
            return Err(NotifyError::NoRecipient);
        }

        let token = self.token().await?;
        let mut status = self.post_message(&token, notification).await?;

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
            let token = self.token().await?;
            status = self.post_message(&token, notification).await?;
        }

        if status.is_success() {
            tracing::info!(to = %notification.to, "SMS dispatched");
            Ok(())
        } else {
            Err(NotifyError::Rejected(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token(token: Option<&str>) -> SmsConfig {
        SmsConfig {
            auth_token: token.map(str::to_string),
            ..SmsConfig::default()
        }
    }

    #[tokio::test]
    async fn test_configured_token_is_cached() {
        let client = SmsClient::new(config_with_token(Some("abc"))).unwrap();
        assert_eq!(client.cached_token().await.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_empty_configured_token_is_ignored() {
        let client = SmsClient::new(config_with_token(Some(""))).unwrap();
        assert!(client.cached_token().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_token() {
        let client = SmsClient::new(config_with_token(Some("abc"))).unwrap();
        client.invalidate_token().await;
        assert!(client.cached_token().await.is_none());
    }

    #[tokio::test]
    async fn test_blank_recipient_is_rejected_before_any_request() {
        let client = SmsClient::new(config_with_token(Some("abc"))).unwrap();
        let result = client
            .notify(&Notification {
                to: "  ".to_string(),
                body: "hello".to_string(),
            })
            .await;
        assert!(matches!(result, Err(NotifyError::NoRecipient)));
    }
}
