// File: voucherbot-common/src/traits/repository_traits.rs

use async_trait::async_trait;
use crate::error::Error;
use crate::models::lucky_win::LuckyWin;
use crate::models::voucher::{NewVoucher, Voucher, VoucherKind};

/// Durable voucher inventory. All mutating methods are atomic at the
/// storage layer; callers never compose a read with a separate write.
#[async_trait]
pub trait VoucherRepository: Send + Sync {
    /// Inserts each code not already present; duplicates are skipped
    /// silently so re-running a fetch against the same batch is safe.
    /// Returns how many rows were actually inserted.
    async fn insert_if_absent(&self, vouchers: &[NewVoucher]) -> Result<u64, Error>;

    /// Reserves exactly one unassigned code of `kind` for `assign_tag`,
    /// selecting and marking it in one atomic step. Returns `None` when
    /// the pool is empty. For the bonus pool the pick is uniform among
    /// eligible rows. A tag already in use surfaces as
    /// `Error::DuplicateAssignment`.
    async fn claim_one_unassigned(
        &self,
        kind: VoucherKind,
        assign_tag: &str,
    ) -> Result<Option<Voucher>, Error>;

    async fn count_free(&self, kind: VoucherKind) -> Result<i64, Error>;

    async fn count_used(&self, kind: VoucherKind) -> Result<i64, Error>;

    /// True if any assignment tag belongs to `identity`, including
    /// suffixed admin and bonus tags.
    async fn has_any_assigned_to(&self, identity: &str) -> Result<bool, Error>;

    /// Data-quality sweep: drops unclaimed rows whose code does not
    /// match the issuer format. Returns rows removed.
    async fn delete_invalid_codes(&self) -> Result<u64, Error>;
}

#[async_trait]
pub trait LuckyWinRepository: Send + Sync {
    async fn record_win(&self, win: &LuckyWin) -> Result<(), Error>;

    /// (number of wins, total sats won) across all time.
    async fn win_totals(&self) -> Result<(i64, i64), Error>;

    async fn list_recent(&self, limit: i64) -> Result<Vec<LuckyWin>, Error>;
}
