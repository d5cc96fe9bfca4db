// tests/helpers.rs (shared fakes for service-level tests)
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use voucherbot_common::error::Error;
use voucherbot_common::models::lucky_win::LuckyWin;
use voucherbot_common::models::voucher::{NewVoucher, Voucher, VoucherKind};
use voucherbot_common::traits::repository_traits::{LuckyWinRepository, VoucherRepository};
use voucherbot_core::config::AppConfig;
use voucherbot_core::services::{ReplenishService, VoucherService};
use voucherbot_core::upstream::{WithdrawApi, WithdrawLink};

static CODE_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^lnurl[0-9a-z]{20,}$").unwrap());

/// In-memory stand-in for the Postgres inventory with the same
/// observable contract: atomic claims (one lock), unique assignment
/// tags, idempotent inserts.
pub struct InMemoryVoucherRepository {
    rows: Mutex<Vec<Voucher>>,
    /// Tags scripted to fail as if the uniqueness constraint rejected
    /// the write, for exercising the lost-race path.
    deny_tags: Mutex<HashSet<String>>,
    /// Tags scripted to fail as if the store stayed contended past the
    /// bounded retries.
    contended_tags: Mutex<HashSet<String>>,
}

impl InMemoryVoucherRepository {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            deny_tags: Mutex::new(HashSet::new()),
            contended_tags: Mutex::new(HashSet::new()),
        }
    }

    pub fn seed(&self, kind: VoucherKind, codes: &[&str]) {
        let mut rows = self.rows.lock().unwrap();
        for code in codes {
            rows.push(Voucher {
                voucher_id: Uuid::new_v4(),
                code: code.to_string(),
                link_id: "seed".to_string(),
                kind,
                assigned_to: None,
                created_at: Utc::now(),
                assigned_at: None,
            });
        }
    }

    pub fn deny_tag(&self, tag: &str) {
        self.deny_tags.lock().unwrap().insert(tag.to_string());
    }

    pub fn contend_tag(&self, tag: &str) {
        self.contended_tags.lock().unwrap().insert(tag.to_string());
    }

    /// Seeds a row that is already claimed, for exercising lockout
    /// against pre-existing (possibly suffixed) assignment tags.
    pub fn seed_assigned(&self, kind: VoucherKind, code: &str, tag: &str) {
        let mut rows = self.rows.lock().unwrap();
        rows.push(Voucher {
            voucher_id: Uuid::new_v4(),
            code: code.to_string(),
            link_id: "seed".to_string(),
            kind,
            assigned_to: Some(tag.to_string()),
            created_at: Utc::now(),
            assigned_at: Some(Utc::now()),
        });
    }

    pub fn assigned_tags(&self) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter_map(|v| v.assigned_to.clone())
            .collect()
    }

    pub fn all_codes(&self) -> Vec<String> {
        self.rows.lock().unwrap().iter().map(|v| v.code.clone()).collect()
    }
}

#[async_trait]
impl VoucherRepository for InMemoryVoucherRepository {
    async fn insert_if_absent(&self, vouchers: &[NewVoucher]) -> Result<u64, Error> {
        let mut rows = self.rows.lock().unwrap();
        let mut inserted = 0;
        for v in vouchers {
            if rows.iter().any(|r| r.code == v.code) {
                continue;
            }
            rows.push(Voucher {
                voucher_id: Uuid::new_v4(),
                code: v.code.clone(),
                link_id: v.link_id.clone(),
                kind: v.kind,
                assigned_to: None,
                created_at: Utc::now(),
                assigned_at: None,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn claim_one_unassigned(
        &self,
        kind: VoucherKind,
        assign_tag: &str,
    ) -> Result<Option<Voucher>, Error> {
        if self.deny_tags.lock().unwrap().contains(assign_tag) {
            return Err(Error::DuplicateAssignment(assign_tag.to_string()));
        }
        if self.contended_tags.lock().unwrap().contains(assign_tag) {
            return Err(Error::Contention("claim retries exhausted".to_string()));
        }

        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.assigned_to.as_deref() == Some(assign_tag))
        {
            return Err(Error::DuplicateAssignment(assign_tag.to_string()));
        }

        let free: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == kind && r.assigned_to.is_none())
            .map(|(i, _)| i)
            .collect();
        if free.is_empty() {
            return Ok(None);
        }

        let idx = match kind {
            VoucherKind::Normal => free[0],
            VoucherKind::Bonus => free[rand::rng().random_range(0..free.len())],
        };
        rows[idx].assigned_to = Some(assign_tag.to_string());
        rows[idx].assigned_at = Some(Utc::now());
        Ok(Some(rows[idx].clone()))
    }

    async fn count_free(&self, kind: VoucherKind) -> Result<i64, Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.kind == kind && r.assigned_to.is_none())
            .count() as i64)
    }

    async fn count_used(&self, kind: VoucherKind) -> Result<i64, Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.kind == kind && r.assigned_to.is_some())
            .count() as i64)
    }

    async fn has_any_assigned_to(&self, identity: &str) -> Result<bool, Error> {
        let prefix = format!("{identity}-");
        Ok(self.rows.lock().unwrap().iter().any(|r| {
            matches!(
                r.assigned_to.as_deref(),
                Some(tag) if tag == identity || tag.starts_with(&prefix)
            )
        }))
    }

    async fn delete_invalid_codes(&self) -> Result<u64, Error> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.assigned_to.is_some() || CODE_FORMAT.is_match(&r.code));
        Ok((before - rows.len()) as u64)
    }
}

pub struct InMemoryLuckyWinRepository {
    pub wins: Mutex<Vec<LuckyWin>>,
}

impl InMemoryLuckyWinRepository {
    pub fn new() -> Self {
        Self {
            wins: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LuckyWinRepository for InMemoryLuckyWinRepository {
    async fn record_win(&self, win: &LuckyWin) -> Result<(), Error> {
        self.wins.lock().unwrap().push(win.clone());
        Ok(())
    }

    async fn win_totals(&self) -> Result<(i64, i64), Error> {
        let wins = self.wins.lock().unwrap();
        let total = wins.iter().map(|w| w.amount_sats).sum();
        Ok((wins.len() as i64, total))
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<LuckyWin>, Error> {
        let wins = self.wins.lock().unwrap();
        Ok(wins.iter().rev().take(limit as usize).cloned().collect())
    }
}

/// Scripted issuer: every batch succeeds (unless told to fail) and
/// exports `codes_per_batch` fresh unique codes.
pub struct ScriptedWithdrawApi {
    pub created: AtomicU32,
    pub fetched: AtomicU32,
    pub fail_create: AtomicBool,
    pub codes_per_batch: u32,
    /// When set, every fetch returns this exact body instead of fresh
    /// codes (for re-fetch idempotency tests).
    pub fixed_csv: Mutex<Option<String>>,
    serial: AtomicU32,
}

impl ScriptedWithdrawApi {
    pub fn new(codes_per_batch: u32) -> Self {
        Self {
            created: AtomicU32::new(0),
            fetched: AtomicU32::new(0),
            fail_create: AtomicBool::new(false),
            codes_per_batch,
            fixed_csv: Mutex::new(None),
            serial: AtomicU32::new(0),
        }
    }

    pub fn batches_created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WithdrawApi for ScriptedWithdrawApi {
    async fn create_withdraw_link(
        &self,
        _title: &str,
        _amount_sats: i64,
        _uses: u32,
    ) -> Result<WithdrawLink, Error> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::UpstreamStatus {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(WithdrawLink {
            id: format!("batch-{n}"),
        })
    }

    async fn fetch_link_csv(&self, _link_id: &str) -> Result<String, Error> {
        self.fetched.fetch_add(1, Ordering::SeqCst);
        if let Some(body) = self.fixed_csv.lock().unwrap().clone() {
            return Ok(body);
        }
        let mut out = String::new();
        for _ in 0..self.codes_per_batch {
            let serial = self.serial.fetch_add(1, Ordering::SeqCst);
            out.push_str(&format!("LNURL1TESTBATCHCODE{serial:08}\n"));
        }
        Ok(out)
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        lnbits_api_base: "https://lnbits.example.com".to_string(),
        lnbits_api_key: "adminkey".to_string(),
        webhook_url: None,
        voucher_title: "LN Voucher".to_string(),
        batch_size: 10,
        voucher_amount_sats: 21,
        admin_identity: Some("admin".to_string()),
        lucky_enabled: false,
        lucky_amount_sats: 10_000,
        lucky_pool_size: 5,
        lucky_chance: 0.0,
        low_stock_floor: 0,
    }
}

pub struct Harness {
    pub service: Arc<VoucherService>,
    pub repo: Arc<InMemoryVoucherRepository>,
    pub wins: Arc<InMemoryLuckyWinRepository>,
    pub api: Arc<ScriptedWithdrawApi>,
}

pub fn build_harness(config: AppConfig, api: ScriptedWithdrawApi) -> Harness {
    let config = Arc::new(config);
    let repo = Arc::new(InMemoryVoucherRepository::new());
    let wins = Arc::new(InMemoryLuckyWinRepository::new());
    let api = Arc::new(api);

    let replenisher = Arc::new(ReplenishService::new(
        config.clone(),
        api.clone() as Arc<dyn WithdrawApi>,
        repo.clone() as Arc<dyn VoucherRepository>,
    ));
    let service = Arc::new(VoucherService::new(
        config,
        repo.clone() as Arc<dyn VoucherRepository>,
        wins.clone() as Arc<dyn LuckyWinRepository>,
        replenisher,
    ));

    Harness {
        service,
        repo,
        wins,
        api,
    }
}
