//! 계정 설정 로딩 (환경변수 또는 CSV)

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use exchanges::backpack::ClientOptions;
use exchanges::BackpackClient;
use interface::ExchangeError;

use crate::bot::{BotConfig, BotError};

pub const DEFAULT_MAX_VOLUME_DAILY: f64 = 2000.0;
pub const DEFAULT_TRADE_PAIR: &str = "SOL_USDC_PERP";
pub const DEFAULT_TRADE_AMOUNT: f64 = 10.0;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("{field} must be a number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {field} is empty")]
    EmptyField { row: usize, field: &'static str },
}

/// 계정 하나 = 클라이언트 하나 = 거래 루프 하나
#[derive(Clone, PartialEq)]
pub struct Account {
    pub api_key: String,
    pub api_secret: String,
    pub proxy: Option<String>,
    pub trade_amount: f64,
    pub max_volume_daily: f64,
    pub trade_pair: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("api_key", &self.api_key)
            .field("proxy", &self.proxy)
            .field("trade_amount", &self.trade_amount)
            .field("max_volume_daily", &self.max_volume_daily)
            .field("trade_pair", &self.trade_pair)
            .finish_non_exhaustive()
    }
}

impl Account {
    /// 로그에 쓰는 짧은 식별자 (공개키 앞 8자)
    pub fn label(&self) -> String {
        self.api_key.chars().take(8).collect()
    }

    pub fn bot_config(&self) -> Result<BotConfig, BotError> {
        BotConfig::new(&self.trade_pair, self.trade_amount, self.max_volume_daily)
    }

    /// 키쌍 검증까지 끝난 클라이언트
    pub fn client(&self) -> Result<BackpackClient, ExchangeError> {
        BackpackClient::with_options(
            &self.api_secret,
            &self.api_key,
            ClientOptions {
                proxy: self.proxy.clone(),
                ..ClientOptions::default()
            },
        )
    }

    /// `API_KEY`, `API_SECRET`, `PROXY_URL`, `TRADE_PAIR`, `TRADE_AMOUNT`, `MAX_VOLUME_DAILY`
    pub fn from_env() -> Result<Self, AccountError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, AccountError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("API_KEY").ok_or(AccountError::MissingEnv("API_KEY"))?;
        let api_secret = get("API_SECRET").ok_or(AccountError::MissingEnv("API_SECRET"))?;

        Ok(Self {
            api_key,
            api_secret,
            proxy: get("PROXY_URL").and_then(|p| first_proxy(&p)),
            trade_amount: parse_number("TRADE_AMOUNT", get("TRADE_AMOUNT"), DEFAULT_TRADE_AMOUNT)?,
            max_volume_daily: parse_number(
                "MAX_VOLUME_DAILY",
                get("MAX_VOLUME_DAILY"),
                DEFAULT_MAX_VOLUME_DAILY,
            )?,
            trade_pair: get("TRADE_PAIR").unwrap_or_else(|| DEFAULT_TRADE_PAIR.to_string()),
        })
    }
}

/// `a|b|c` 중 첫 번째 프록시
fn first_proxy(raw: &str) -> Option<String> {
    raw.split('|')
        .map(str::trim)
        .find(|p| !p.is_empty())
        .map(str::to_string)
}

fn parse_number(field: &'static str, raw: Option<String>, default: f64) -> Result<f64, AccountError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| AccountError::InvalidNumber { field, value }),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRow {
    api_key: Option<String>,
    api_secret: Option<String>,
    #[serde(default)]
    proxy: Option<String>,
    #[serde(default)]
    trade_amount: Option<f64>,
    #[serde(default)]
    max_volume_daily: Option<f64>,
    #[serde(default)]
    trade_pair: Option<String>,
}

/// 헤더 `apiKey,apiSecret,proxy,tradeAmount,maxVolumeDaily,tradePair`
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Account>, AccountError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| AccountError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_csv(file)
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Account>, AccountError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut accounts = Vec::new();
    for (i, row) in reader.deserialize::<AccountRow>().enumerate() {
        let row = row?;
        // 헤더 다음 줄이 1행
        let line = i + 1;
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        let api_key = non_empty(row.api_key).ok_or(AccountError::EmptyField { row: line, field: "apiKey" })?;
        let api_secret =
            non_empty(row.api_secret).ok_or(AccountError::EmptyField { row: line, field: "apiSecret" })?;

        accounts.push(Account {
            api_key,
            api_secret,
            proxy: row.proxy.as_deref().and_then(first_proxy),
            trade_amount: row.trade_amount.unwrap_or(DEFAULT_TRADE_AMOUNT),
            max_volume_daily: row.max_volume_daily.unwrap_or(DEFAULT_MAX_VOLUME_DAILY),
            trade_pair: non_empty(row.trade_pair).unwrap_or_else(|| DEFAULT_TRADE_PAIR.to_string()),
        });
    }

    Ok(accounts)
}
