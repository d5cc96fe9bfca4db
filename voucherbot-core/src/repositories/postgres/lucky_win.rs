// File: voucherbot-core/src/repositories/postgres/lucky_win.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use voucherbot_common::error::Error;
use voucherbot_common::models::lucky_win::LuckyWin;
use voucherbot_common::traits::repository_traits::LuckyWinRepository;

pub struct PostgresLuckyWinRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresLuckyWinRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LuckyWinRepository for PostgresLuckyWinRepository {
    async fn record_win(&self, win: &LuckyWin) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO lucky_wins (win_id, identity, display_name, amount_sats, won_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(win.win_id)
        .bind(&win.identity)
        .bind(&win.display_name)
        .bind(win.amount_sats)
        .bind(win.won_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn win_totals(&self) -> Result<(i64, i64), Error> {
        let row = sqlx::query(
            // SUM over BIGINT widens to NUMERIC; cast back down.
            "SELECT COUNT(*) AS wins, COALESCE(SUM(amount_sats), 0)::BIGINT AS total FROM lucky_wins",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok((row.try_get("wins")?, row.try_get("total")?))
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<LuckyWin>, Error> {
        let rows = sqlx::query_as::<_, LuckyWin>(
            r#"
            SELECT win_id, identity, display_name, amount_sats, won_at
            FROM lucky_wins
            ORDER BY won_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
