use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

use super::error::{CustodyError, CustodyResult};
use super::types::{CreatedWallet, TransferRequest, TransferResponse};
use crate::config::CustodyConfig;

/// The custody collaborator surface: wallet provisioning and outbound
/// transfer initiation. Webhook delivery is the other half of the contract
/// and comes to us, not from us.
#[async_trait]
pub trait CustodyApi: Send + Sync {
    /// Provision an MPC wallet on the given network, tagged with our
    /// external reference so events can be traced back.
    async fn create_wallet(
        &self,
        network: &str,
        external_ref: &str,
    ) -> CustodyResult<CreatedWallet>;

    /// Ask custody to move tokens out of one of our wallets. The returned
    /// transfer id is the idempotency key for later outcome events.
    async fn initiate_transfer(
        &self,
        custody_wallet_id: &str,
        request: TransferRequest,
    ) -> CustodyResult<TransferResponse>;
}

/// HTTP client for the custody REST API
pub struct CustodyClient {
    client: Client,
    base_url: String,
    api_token: String,
    timeout: Duration,
    max_retries: u32,
}

impl CustodyClient {
    pub fn new(config: &CustodyConfig) -> CustodyResult<Self> {
        let timeout = Duration::from_secs(config.request_timeout);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CustodyError::Network {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            timeout,
            max_retries: 2,
        })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> CustodyResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let response = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .bearer_auth(&self.api_token)
                .json(body)
                .send()
                .await
                .map_err(|e| CustodyError::Network {
                    message: format!("custody request failed: {}", e),
                });

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    if status.is_success() {
                        return serde_json::from_str::<T>(&text).map_err(|e| {
                            CustodyError::InvalidResponse {
                                message: format!("invalid custody JSON response: {}", e),
                            }
                        });
                    }

                    if (status.is_server_error() || status.as_u16() == 429)
                        && attempt < self.max_retries
                    {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "custody API error, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }

                    return Err(CustodyError::Api {
                        status: status.as_u16(),
                        message: text,
                        retryable: status.is_server_error(),
                    });
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(CustodyError::Network {
            message: "custody request failed".to_string(),
        }))
    }
}

#[async_trait]
impl CustodyApi for CustodyClient {
    async fn create_wallet(
        &self,
        network: &str,
        external_ref: &str,
    ) -> CustodyResult<CreatedWallet> {
        self.post_json(
            "/wallets",
            &json!({
                "network": network,
                "externalId": external_ref,
            }),
        )
        .await
    }

    async fn initiate_transfer(
        &self,
        custody_wallet_id: &str,
        request: TransferRequest,
    ) -> CustodyResult<TransferResponse> {
        let body = serde_json::to_value(&request).map_err(|e| CustodyError::InvalidResponse {
            message: format!("unserializable transfer request: {}", e),
        })?;
        self.post_json(
            &format!("/wallets/{}/transfers", custody_wallet_id),
            &body,
        )
        .await
    }
}
