//! Subscription payments. The gateway is an external service reached through
//! [`PaymentGateway`]; this module only owns the status polling schedule.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error("Could not confirm payment after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Reversed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Amount in minor currency units
    pub amount: u64,
    pub currency: String,
    pub plan: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn request_payment(&self, request: &PaymentRequest) -> Result<PaymentReceipt, PaymentError>;
    async fn check_status(&self, transaction_id: &str) -> Result<PaymentStatus, PaymentError>;
    async fn reverse(&self, transaction_id: &str) -> Result<PaymentStatus, PaymentError>;
}

/// Retries failed status checks after `backoff_base * attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPoller {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for StatusPoller {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

impl StatusPoller {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.payment_max_attempts.max(1),
            backoff_base: config.payment_backoff(),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }

    pub async fn poll<G: PaymentGateway + ?Sized>(
        &self,
        gateway: &G,
        transaction_id: &str,
    ) -> Result<PaymentStatus, PaymentError> {
        let mut attempt = 1;
        loop {
            match gateway.check_status(transaction_id).await {
                Ok(status) => {
                    tracing::info!(transaction_id, ?status, attempt, "payment status received");
                    return Ok(status);
                }
                Err(err) if attempt >= self.max_attempts => {
                    return Err(PaymentError::Exhausted {
                        attempts: attempt,
                        last: err.to_string(),
                    });
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        transaction_id,
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "payment status check failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
