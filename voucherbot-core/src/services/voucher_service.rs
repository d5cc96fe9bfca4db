// File: voucherbot-core/src/services/voucher_service.rs

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use voucherbot_common::error::Error;
use voucherbot_common::models::allocation::{AllocationOutcome, IssuedVoucher, VoucherStats};
use voucherbot_common::models::lucky_win::LuckyWin;
use voucherbot_common::models::voucher::{Voucher, VoucherKind};
use voucherbot_common::traits::repository_traits::{LuckyWinRepository, VoucherRepository};

use crate::config::AppConfig;
use crate::services::replenish_service::ReplenishService;

/// Outcome of one claim attempt against the store, with the two
/// expected rejections folded in so `allocate` reads as policy.
enum ClaimStep {
    Got(Voucher),
    Empty,
    TagTaken,
    Busy,
}

/// Request-facing allocation engine: one code per identity (admins
/// exempt), an independent weighted bonus draw, and low-water-mark
/// refill after every claim.
pub struct VoucherService {
    config: Arc<AppConfig>,
    vouchers: Arc<dyn VoucherRepository>,
    lucky_wins: Arc<dyn LuckyWinRepository>,
    replenisher: Arc<ReplenishService>,
}

impl VoucherService {
    pub fn new(
        config: Arc<AppConfig>,
        vouchers: Arc<dyn VoucherRepository>,
        lucky_wins: Arc<dyn LuckyWinRepository>,
        replenisher: Arc<ReplenishService>,
    ) -> Self {
        Self {
            config,
            vouchers,
            lucky_wins,
            replenisher,
        }
    }

    /// Reserve one normal code for `identity`, maybe a bonus code too.
    ///
    /// The already-claimed check is advisory: two near-simultaneous
    /// first claims can both pass it, and the store's uniqueness
    /// constraint on the assignment tag rejects the loser. That
    /// rejection collapses to `AlreadyClaimed` here rather than
    /// surfacing as a fault.
    pub async fn allocate(
        &self,
        identity: &str,
        display_name: &str,
        is_admin: bool,
    ) -> Result<AllocationOutcome, Error> {
        if !is_admin && self.vouchers.has_any_assigned_to(identity).await? {
            debug!("{} already holds a voucher", identity);
            return Ok(AllocationOutcome::AlreadyClaimed);
        }

        let tag = assign_tag(identity, is_admin);

        let normal = match self.try_claim(VoucherKind::Normal, &tag).await? {
            ClaimStep::Got(v) => v,
            ClaimStep::TagTaken => return Ok(AllocationOutcome::AlreadyClaimed),
            ClaimStep::Busy => return Ok(AllocationOutcome::OutOfStock),
            ClaimStep::Empty => {
                info!("Normal pool empty, replenishing before retry");
                if let Err(e) = self.replenisher.replenish(VoucherKind::Normal).await {
                    error!("Replenishment failed: {}", e);
                    return Ok(AllocationOutcome::OutOfStock);
                }
                match self.try_claim(VoucherKind::Normal, &tag).await? {
                    ClaimStep::Got(v) => v,
                    ClaimStep::TagTaken => return Ok(AllocationOutcome::AlreadyClaimed),
                    ClaimStep::Empty | ClaimStep::Busy => {
                        return Ok(AllocationOutcome::OutOfStock);
                    }
                }
            }
        };
        info!("Issued voucher from batch {} to {}", normal.link_id, tag);

        let bonus = self.maybe_claim_bonus(identity, display_name, &tag).await;

        self.check_and_refill().await;

        Ok(AllocationOutcome::Issued {
            normal: self.issued(&normal),
            bonus,
        })
    }

    /// Weighted coin-flip for the bonus pool. Every failure mode short
    /// of a won draw is silent for the claimant: they keep their normal
    /// code and nothing else happens.
    async fn maybe_claim_bonus(
        &self,
        identity: &str,
        display_name: &str,
        base_tag: &str,
    ) -> Option<IssuedVoucher> {
        if !self.config.lucky_enabled {
            return None;
        }
        if rand::random::<f64>() >= self.config.lucky_chance {
            return None;
        }

        let bonus_tag = format!("{base_tag}-bonus");
        match self.try_claim(VoucherKind::Bonus, &bonus_tag).await {
            Ok(ClaimStep::Got(v)) => {
                info!(
                    "Lucky bonus won by {} ({} sats)",
                    identity, self.config.lucky_amount_sats
                );
                let win = LuckyWin::new(identity, display_name, self.config.lucky_amount_sats);
                if let Err(e) = self.lucky_wins.record_win(&win).await {
                    // The claimant keeps the code either way.
                    warn!("Failed to record lucky win for {}: {}", identity, e);
                }
                Some(self.bonus_issued(&v))
            }
            Ok(ClaimStep::Empty) => {
                debug!("Bonus pool empty, claim proceeds without bonus");
                None
            }
            Ok(ClaimStep::TagTaken) | Ok(ClaimStep::Busy) => None,
            Err(e) => {
                warn!("Bonus claim failed for {}: {}", identity, e);
                None
            }
        }
    }

    async fn try_claim(&self, kind: VoucherKind, tag: &str) -> Result<ClaimStep, Error> {
        match self.vouchers.claim_one_unassigned(kind, tag).await {
            Ok(Some(v)) => Ok(ClaimStep::Got(v)),
            Ok(None) => Ok(ClaimStep::Empty),
            Err(Error::DuplicateAssignment(taken)) => {
                debug!("Assignment tag {} already taken, lost the race", taken);
                Ok(ClaimStep::TagTaken)
            }
            Err(Error::Contention(msg)) => {
                warn!("Claim gave up under contention: {}", msg);
                Ok(ClaimStep::Busy)
            }
            Err(e) => Err(e),
        }
    }

    /// Low-water-mark check, run after every allocation. Deliberately
    /// outside the claim transaction; refill errors are logged and the
    /// next allocation tries again.
    pub async fn check_and_refill(&self) {
        match self.vouchers.count_free(VoucherKind::Normal).await {
            Ok(free) => {
                let threshold = self.config.low_stock_threshold();
                if free < threshold {
                    info!(
                        "Normal voucher supply low ({} < {}), refilling",
                        free, threshold
                    );
                    if let Err(e) = self.replenisher.replenish(VoucherKind::Normal).await {
                        error!("Low-stock refill failed: {}", e);
                    }
                }
            }
            Err(e) => error!("Supply check failed: {}", e),
        }

        if !self.config.lucky_enabled {
            return;
        }
        match self.vouchers.count_free(VoucherKind::Bonus).await {
            Ok(0) => {
                info!("Bonus pool exhausted, refilling");
                if let Err(e) = self.replenisher.replenish(VoucherKind::Bonus).await {
                    error!("Bonus refill failed: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => error!("Bonus supply check failed: {}", e),
        }
    }

    /// Startup seeding: make sure both pools exist before the first
    /// claim arrives.
    pub async fn ensure_initial_stock(&self) -> Result<(), Error> {
        if self.vouchers.count_free(VoucherKind::Normal).await? == 0 {
            self.replenisher.replenish(VoucherKind::Normal).await?;
        }
        if self.config.lucky_enabled
            && self.vouchers.count_free(VoucherKind::Bonus).await? == 0
        {
            self.replenisher.replenish(VoucherKind::Bonus).await?;
        }
        Ok(())
    }

    pub async fn stats(&self) -> Result<VoucherStats, Error> {
        let (total_bonus_wins, total_bonus_sats) = self.lucky_wins.win_totals().await?;
        Ok(VoucherStats {
            used_normal: self.vouchers.count_used(VoucherKind::Normal).await?,
            free_normal: self.vouchers.count_free(VoucherKind::Normal).await?,
            used_bonus: self.vouchers.count_used(VoucherKind::Bonus).await?,
            free_bonus: self.vouchers.count_free(VoucherKind::Bonus).await?,
            total_bonus_wins,
            total_bonus_sats,
        })
    }

    /// Most recent bonus wins, newest first, for the admin reporting
    /// surface.
    pub async fn recent_wins(&self, limit: i64) -> Result<Vec<LuckyWin>, Error> {
        self.lucky_wins.list_recent(limit).await
    }

    /// Administrative sweep for rows that predate format validation.
    pub async fn cleanup_invalid_codes(&self) -> Result<u64, Error> {
        let removed = self.vouchers.delete_invalid_codes().await?;
        if removed > 0 {
            warn!("Removed {} malformed voucher rows", removed);
        }
        Ok(removed)
    }

    fn issued(&self, v: &Voucher) -> IssuedVoucher {
        IssuedVoucher {
            code: v.code.clone(),
            link_id: v.link_id.clone(),
            amount_sats: self.config.voucher_amount_sats,
        }
    }

    fn bonus_issued(&self, v: &Voucher) -> IssuedVoucher {
        IssuedVoucher {
            code: v.code.clone(),
            link_id: v.link_id.clone(),
            amount_sats: self.config.lucky_amount_sats,
        }
    }
}

/// Non-admins are tagged with their raw identity so the tag uniqueness
/// constraint enforces one code per identity. Admins get a nanosecond
/// suffix per claim, which keeps repeated operational claims from
/// colliding. Intentional and load-bearing; do not collapse admins to
/// one claim.
fn assign_tag(identity: &str, is_admin: bool) -> String {
    if is_admin {
        let now = Utc::now();
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros());
        format!("{identity}-{nanos}")
    } else {
        identity.to_string()
    }
}
