// File: voucherbot-core/src/services/replenish_service.rs

use std::sync::Arc;
use tracing::{error, info};
use voucherbot_common::error::Error;
use voucherbot_common::models::voucher::{NewVoucher, VoucherKind};
use voucherbot_common::traits::repository_traits::VoucherRepository;

use crate::config::AppConfig;
use crate::upstream::extract::extract_codes;
use crate::upstream::WithdrawApi;

/// Fetches fresh batches from the issuer and lands them in the store.
/// One call is one attempt: creation failures are reported, never
/// retried in a loop within the same request.
pub struct ReplenishService {
    config: Arc<AppConfig>,
    api: Arc<dyn WithdrawApi>,
    vouchers: Arc<dyn VoucherRepository>,
}

impl ReplenishService {
    pub fn new(
        config: Arc<AppConfig>,
        api: Arc<dyn WithdrawApi>,
        vouchers: Arc<dyn VoucherRepository>,
    ) -> Self {
        Self {
            config,
            api,
            vouchers,
        }
    }

    /// Creates a new batch of `kind` codes upstream, pulls its export,
    /// and inserts every extracted code. Returns how many codes were
    /// actually new (idempotent against re-fetching a batch).
    pub async fn replenish(&self, kind: VoucherKind) -> Result<u64, Error> {
        let (title, amount_sats, uses) = match kind {
            VoucherKind::Normal => (
                self.config.voucher_title.as_str(),
                self.config.voucher_amount_sats,
                self.config.batch_size,
            ),
            VoucherKind::Bonus => (
                "Lucky Voucher",
                self.config.lucky_amount_sats,
                self.config.lucky_pool_size,
            ),
        };

        info!(
            "Creating {} voucher batch ({} uses, {} sats each)",
            kind, uses, amount_sats
        );
        let link = self.api.create_withdraw_link(title, amount_sats, uses).await?;

        let raw = self.api.fetch_link_csv(&link.id).await?;
        let codes = extract_codes(&raw);
        if codes.is_empty() {
            // The batch exists upstream but is unusable. Operational
            // alert condition, not something to swallow.
            error!("Batch {} exported zero usable codes", link.id);
            return Err(Error::MalformedPayload(format!(
                "no valid codes in export for link {}",
                link.id
            )));
        }

        let new_vouchers: Vec<NewVoucher> = codes
            .iter()
            .map(|code| NewVoucher::new(code, &link.id, kind))
            .collect();
        let inserted = self.vouchers.insert_if_absent(&new_vouchers).await?;

        info!(
            "Imported {} new {} vouchers from batch {} ({} extracted)",
            inserted,
            kind,
            link.id,
            codes.len()
        );
        Ok(inserted)
    }
}
