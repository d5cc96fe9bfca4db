// File: voucherbot-common/src/models/allocation.rs

use serde::{Deserialize, Serialize};

/// What the transport layer needs to hand a code to a claimant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuedVoucher {
    pub code: String,
    pub link_id: String,
    pub amount_sats: i64,
}

/// Result of one claim request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AllocationOutcome {
    /// Non-admin identity that already holds a code. A normal outcome,
    /// not an error.
    AlreadyClaimed,
    /// No code could be reserved right now (empty pool and the refill
    /// attempt failed, or the store stayed contended past the retry
    /// budget). The next claim will try again.
    OutOfStock,
    Issued {
        normal: IssuedVoucher,
        bonus: Option<IssuedVoucher>,
    },
}

/// Inventory counters for the admin stats surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VoucherStats {
    pub used_normal: i64,
    pub free_normal: i64,
    pub used_bonus: i64,
    pub free_bonus: i64,
    pub total_bonus_wins: i64,
    pub total_bonus_sats: i64,
}
