// File: voucherbot-core/src/upstream/mod.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use voucherbot_common::error::Error;

pub mod client;
pub mod extract;

pub use client::LnbitsClient;
pub use extract::extract_codes;

/// Body for `POST /withdraw/api/v1/links`. One link with `uses` > 1 and
/// `is_unique` set is a batch of single-use codes.
#[derive(Debug, Clone, Serialize)]
pub struct CreateWithdrawLink {
    pub title: String,
    pub min_withdrawable: i64,
    pub max_withdrawable: i64,
    pub uses: u32,
    pub wait_time: u32,
    pub is_unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawLink {
    pub id: String,
}

/// The two issuer endpoints the engine consumes. Trait-shaped so tests
/// can run against a mock instead of a live LNbits instance.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WithdrawApi: Send + Sync {
    /// Create a batch of `uses` fixed-amount codes. Non-success status
    /// surfaces as `Error::UpstreamStatus`.
    async fn create_withdraw_link(
        &self,
        title: &str,
        amount_sats: i64,
        uses: u32,
    ) -> Result<WithdrawLink, Error>;

    /// Export the batch as newline-delimited text. The body is returned
    /// raw; it is occasionally an HTML error page and the extractor is
    /// responsible for telling the difference.
    async fn fetch_link_csv(&self, link_id: &str) -> Result<String, Error>;
}
