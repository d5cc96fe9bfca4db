// File: voucherbot-common/src/models/voucher.rs

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normal and bonus codes live in disjoint pools and are never
/// cross-assigned.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
pub enum VoucherKind {
    Normal,
    Bonus,
}

impl fmt::Display for VoucherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoucherKind::Normal => write!(f, "normal"),
            VoucherKind::Bonus => write!(f, "bonus"),
        }
    }
}

/// One redeemable withdraw code. `assigned_to` is set exactly once,
/// by the claim statement, and never cleared.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Voucher {
    pub voucher_id: Uuid,
    pub code: String,
    pub link_id: String,
    pub kind: VoucherKind,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}

/// Ingestion shape for a freshly exported batch.
#[derive(Debug, Clone)]
pub struct NewVoucher {
    pub code: String,
    pub link_id: String,
    pub kind: VoucherKind,
}

impl NewVoucher {
    pub fn new(code: &str, link_id: &str, kind: VoucherKind) -> Self {
        Self {
            code: code.to_string(),
            link_id: link_id.to_string(),
            kind,
        }
    }
}
