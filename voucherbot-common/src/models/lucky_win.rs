// File: voucherbot-common/src/models/lucky_win.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit record appended when a bonus code is reserved for a claim.
/// Never mutated or deleted.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct LuckyWin {
    pub win_id: Uuid,
    pub identity: String,
    pub display_name: String,
    pub amount_sats: i64,
    pub won_at: DateTime<Utc>,
}

impl LuckyWin {
    pub fn new(identity: &str, display_name: &str, amount_sats: i64) -> Self {
        Self {
            win_id: Uuid::new_v4(),
            identity: identity.to_string(),
            display_name: display_name.to_string(),
            amount_sats,
            won_at: Utc::now(),
        }
    }
}
