// File: voucherbot-core/src/config.rs

use voucherbot_common::error::Error;

/// Immutable runtime configuration, built once at startup from the
/// environment and passed to each component. Missing required settings
/// are the only fatal startup failures.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the LNbits instance, e.g. "https://lnbits.example.com".
    pub lnbits_api_base: String,
    /// Wallet admin key, sent as `X-Api-Key` on every issuer call.
    pub lnbits_api_key: String,
    /// Optional webhook the issuer calls on withdraw.
    pub webhook_url: Option<String>,

    pub voucher_title: String,
    pub batch_size: u32,
    pub voucher_amount_sats: i64,

    /// Identity allowed unlimited claims for operational testing.
    pub admin_identity: Option<String>,

    pub lucky_enabled: bool,
    pub lucky_amount_sats: i64,
    pub lucky_pool_size: u32,
    /// Fraction in [0, 1]. The env value is a percentage.
    pub lucky_chance: f64,

    pub low_stock_floor: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let lnbits_api_base = required(&get, "LNBITS_API_URL")?
            .trim_end_matches('/')
            .to_string();
        let lnbits_api_key = required(&get, "LNBITS_API_KEY")?;

        let chance_percent: f64 = parsed(&get, "LUCKY_VOUCHER_CHANCE", 0.10)?;
        if !(0.0..=100.0).contains(&chance_percent) {
            return Err(Error::Config(format!(
                "LUCKY_VOUCHER_CHANCE must be a percentage in [0, 100], got {chance_percent}"
            )));
        }

        Ok(Self {
            lnbits_api_base,
            lnbits_api_key,
            webhook_url: get("LNBITS_WEBHOOK_URL").filter(|v| !v.is_empty()),
            voucher_title: get("VOUCHER_TITLE").unwrap_or_else(|| "LN Voucher".to_string()),
            batch_size: parsed(&get, "VOUCHER_BATCH_SIZE", 100)?,
            voucher_amount_sats: parsed(&get, "VOUCHER_AMOUNT_SATS", 21)?,
            admin_identity: get("ADMIN_IDENTITY").filter(|v| !v.is_empty()),
            lucky_enabled: get("LUCKY_VOUCHER_ENABLED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            lucky_amount_sats: parsed(&get, "LUCKY_VOUCHER_AMOUNT", 10_000)?,
            lucky_pool_size: parsed(&get, "LUCKY_VOUCHER_COUNT", 5)?,
            lucky_chance: chance_percent / 100.0,
            low_stock_floor: parsed(&get, "LOW_STOCK_FLOOR", 10)?,
        })
    }

    /// Free normal stock below this triggers a refill.
    pub fn low_stock_threshold(&self) -> i64 {
        self.low_stock_floor.max((self.batch_size / 10) as i64)
    }

    pub fn is_admin(&self, identity: &str) -> bool {
        self.admin_identity.as_deref() == Some(identity)
    }
}

fn required(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, Error> {
    get(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("Missing required environment variable: {key}")))
}

fn parsed<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, Error> {
    match get(key) {
        Some(raw) if !raw.is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("Invalid value for {key}: {raw:?}"))),
        _ => Ok(default),
    }
}
