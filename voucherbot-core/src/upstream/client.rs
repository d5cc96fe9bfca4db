// File: voucherbot-core/src/upstream/client.rs

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::{error, info};
use voucherbot_common::error::Error;

use super::{CreateWithdrawLink, WithdrawApi, WithdrawLink};

/// Every issuer call is bounded so one slow upstream response cannot
/// stall unrelated claims.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin typed client for the LNbits withdraw extension.
pub struct LnbitsClient {
    http: ReqwestClient,
    base_url: String,
    api_key: String,
    webhook_url: Option<String>,
}

impl LnbitsClient {
    pub fn new(base_url: &str, api_key: &str, webhook_url: Option<String>) -> Self {
        Self {
            http: ReqwestClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            webhook_url,
        }
    }
}

#[async_trait]
impl WithdrawApi for LnbitsClient {
    async fn create_withdraw_link(
        &self,
        title: &str,
        amount_sats: i64,
        uses: u32,
    ) -> Result<WithdrawLink, Error> {
        let url = format!("{}/withdraw/api/v1/links", self.base_url);
        let body = CreateWithdrawLink {
            title: title.to_string(),
            min_withdrawable: amount_sats,
            max_withdrawable: amount_sats,
            uses,
            wait_time: 1,
            is_unique: true,
            webhook_url: self.webhook_url.clone(),
        };

        let resp = self
            .http
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            error!("Failed to create withdraw link: {} {}", status, body);
            return Err(Error::UpstreamStatus { status, body });
        }

        let link = resp.json::<WithdrawLink>().await?;
        info!("Withdraw link created: {}", link.id);
        Ok(link)
    }

    async fn fetch_link_csv(&self, link_id: &str) -> Result<String, Error> {
        let url = format!("{}/withdraw/csv/{}", self.base_url, link_id);

        let resp = self
            .http
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .header("Accept", "text/csv")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            error!("Failed to fetch CSV for link {}: {} {}", link_id, status, body);
            return Err(Error::UpstreamStatus { status, body });
        }

        Ok(resp.text().await?)
    }
}
