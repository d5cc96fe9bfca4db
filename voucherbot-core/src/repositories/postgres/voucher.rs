// File: voucherbot-core/src/repositories/postgres/voucher.rs

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;
use voucherbot_common::error::Error;
use voucherbot_common::models::voucher::{NewVoucher, Voucher, VoucherKind};
use voucherbot_common::traits::repository_traits::VoucherRepository;

use crate::upstream::extract::CODE_SHAPE;

/// Transient contention is retried this many times with a short
/// growing sleep before surfacing `Error::Contention`.
const CLAIM_ATTEMPTS: u32 = 5;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// How many times the bonus picker re-samples after losing an update
/// race before reporting the pool empty.
const BONUS_SAMPLE_PASSES: u32 = 3;

pub struct PostgresVoucherRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresVoucherRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Single-statement claim: select one free row and mark it assigned
    /// atomically. `SKIP LOCKED` keeps two concurrent claimants off the
    /// same row without either blocking.
    async fn claim_first_free(
        &self,
        kind: VoucherKind,
        assign_tag: &str,
    ) -> Result<Option<Voucher>, sqlx::Error> {
        let row_opt = sqlx::query(
            r#"
            UPDATE vouchers
            SET assigned_to = $1, assigned_at = $2
            WHERE voucher_id = (
                SELECT voucher_id
                FROM vouchers
                WHERE kind = $3 AND assigned_to IS NULL
                ORDER BY created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING voucher_id, code, link_id, kind, assigned_to, created_at, assigned_at
            "#,
        )
        .bind(assign_tag)
        .bind(Utc::now())
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        row_opt.map(|r| row_to_voucher(&r)).transpose()
    }

    /// Bonus picks are uniform among eligible rows, not first-available:
    /// sample the candidate set in application code, then assign with a
    /// conditional update. Losing the update race re-samples a bounded
    /// number of times.
    async fn claim_random_free(
        &self,
        kind: VoucherKind,
        assign_tag: &str,
    ) -> Result<Option<Voucher>, sqlx::Error> {
        for _ in 0..BONUS_SAMPLE_PASSES {
            let candidates: Vec<Uuid> = sqlx::query_scalar(
                "SELECT voucher_id FROM vouchers WHERE kind = $1 AND assigned_to IS NULL",
            )
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;

            if candidates.is_empty() {
                return Ok(None);
            }

            let picked = {
                let mut rng = rand::rng();
                candidates[rng.random_range(0..candidates.len())]
            };

            let row_opt = sqlx::query(
                r#"
                UPDATE vouchers
                SET assigned_to = $1, assigned_at = $2
                WHERE voucher_id = $3 AND assigned_to IS NULL
                RETURNING voucher_id, code, link_id, kind, assigned_to, created_at, assigned_at
                "#,
            )
            .bind(assign_tag)
            .bind(Utc::now())
            .bind(picked)
            .fetch_optional(&self.pool)
            .await?;

            match row_opt {
                Some(r) => return Ok(Some(row_to_voucher(&r)?)),
                None => debug!("Lost bonus claim race on {}, re-sampling", picked),
            }
        }
        Ok(None)
    }

    async fn claim_once(
        &self,
        kind: VoucherKind,
        assign_tag: &str,
    ) -> Result<Option<Voucher>, sqlx::Error> {
        match kind {
            VoucherKind::Normal => self.claim_first_free(kind, assign_tag).await,
            VoucherKind::Bonus => self.claim_random_free(kind, assign_tag).await,
        }
    }
}

#[async_trait]
impl VoucherRepository for PostgresVoucherRepository {
    async fn insert_if_absent(&self, vouchers: &[NewVoucher]) -> Result<u64, Error> {
        let mut inserted = 0u64;
        for v in vouchers {
            let result = sqlx::query(
                r#"
                INSERT INTO vouchers (voucher_id, code, link_id, kind, created_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (code) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&v.code)
            .bind(&v.link_id)
            .bind(v.kind)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn claim_one_unassigned(
        &self,
        kind: VoucherKind,
        assign_tag: &str,
    ) -> Result<Option<Voucher>, Error> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.claim_once(kind, assign_tag).await {
                Ok(v) => return Ok(v),
                Err(e) if is_unique_violation(&e) => {
                    return Err(Error::DuplicateAssignment(assign_tag.to_string()));
                }
                Err(e) if is_contention(&e) && attempt < CLAIM_ATTEMPTS => {
                    warn!("Claim attempt {} hit contention, retrying: {}", attempt, e);
                    tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
                }
                Err(e) if is_contention(&e) => {
                    return Err(Error::Contention(e.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn count_free(&self, kind: VoucherKind) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM vouchers WHERE kind = $1 AND assigned_to IS NULL",
        )
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_used(&self, kind: VoucherKind) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM vouchers WHERE kind = $1 AND assigned_to IS NOT NULL",
        )
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn has_any_assigned_to(&self, identity: &str) -> Result<bool, Error> {
        // Suffixed tags (admin timestamps, bonus markers) still belong
        // to the base identity.
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM vouchers
                WHERE assigned_to = $1 OR assigned_to LIKE $2
            )
            "#,
        )
        .bind(identity)
        .bind(format!("{identity}-%"))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn delete_invalid_codes(&self) -> Result<u64, Error> {
        let result = sqlx::query(
            "DELETE FROM vouchers WHERE assigned_to IS NULL AND code !~* $1",
        )
        .bind(format!("^{}$", strip_inline_flags(CODE_SHAPE)))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

fn row_to_voucher(r: &PgRow) -> Result<Voucher, sqlx::Error> {
    Ok(Voucher {
        voucher_id: r.try_get("voucher_id")?,
        code: r.try_get("code")?,
        link_id: r.try_get("link_id")?,
        kind: r.try_get("kind")?,
        assigned_to: r.try_get("assigned_to")?,
        created_at: r.try_get("created_at")?,
        assigned_at: r.try_get("assigned_at")?,
    })
}

/// `~*` is already case-insensitive; the Rust-side `(?i)` flag is not
/// valid Postgres regex syntax.
fn strip_inline_flags(pattern: &str) -> &str {
    pattern.strip_prefix("(?i)").unwrap_or(pattern)
}

fn pg_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.to_string()),
        _ => None,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    pg_code(err).as_deref() == Some("23505")
}

fn is_contention(err: &sqlx::Error) -> bool {
    matches!(
        pg_code(err).as_deref(),
        Some("40001") | Some("40P01") | Some("55P03")
    )
}
