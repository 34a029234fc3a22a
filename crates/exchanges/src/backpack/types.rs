use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use interface::{ExchangeError, OrderStatus, OrderType, Side, TimeInForce};

use super::params::Params;

/// 정규화 이후에도 숫자가 문자열로 남아 있을 수 있어 둘 다 받는다
fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!("expected a number, got {}", other))),
    }
}

pub(crate) fn flexible_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => flexible_f64(value).map(Some).map_err(serde::de::Error::custom),
    }
}

/// 주문 id 는 숫자로 정규화되지만 식별자로만 쓰므로 문자열로 되돌린다
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected id {}", other))),
    }
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(what: &str, value: Value) -> Result<T, ExchangeError> {
    serde_json::from_value(value).map_err(|e| ExchangeError::Decode(format!("{}: {}", what, e)))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct BalanceEntry {
    #[serde(default, deserialize_with = "flexible_f64")]
    pub available: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub locked: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub staked: f64,
}

/// 자산 심볼 -> 잔고
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Balances(pub HashMap<String, BalanceEntry>);

impl Balances {
    /// 없는 자산은 0
    pub fn available(&self, asset: &str) -> f64 {
        self.0.get(asset).map(|b| b.available).unwrap_or(0.0)
    }

    pub fn get(&self, asset: &str) -> Option<&BalanceEntry> {
        self.0.get(asset)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    #[serde(deserialize_with = "flexible_f64")]
    pub last_price: f64,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub quote_volume: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub status: OrderStatus,
    #[serde(default)]
    pub order_type: Option<OrderType>,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub executed_quantity: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub executed_quote_quantity: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub price: Option<f64>,
}

impl Order {
    /// 전량 체결되었고 기대한 방향인지
    pub fn is_filled_as(&self, side: Side) -> bool {
        self.status == OrderStatus::Filled && self.side == side
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    #[serde(deserialize_with = "flexible_f64")]
    pub net_quantity: f64,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub entry_price: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub mark_price: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub pnl_unrealized: Option<f64>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.net_quantity != 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(deserialize_with = "flexible_f64")]
    pub price: f64,
    #[serde(deserialize_with = "flexible_f64")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub fee: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

/// orderExecute 요청 본문
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    /// 거래소 정밀도에 맞춰 이미 문자열로 만든 수량
    pub quantity: String,
    pub price: Option<f64>,
    pub time_in_force: Option<TimeInForce>,
    pub reduce_only: bool,
}

impl OrderRequest {
    /// 지정가 IOC
    pub fn limit_ioc(symbol: impl Into<String>, side: Side, quantity: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity: quantity.into(),
            price: Some(price),
            time_in_force: Some(TimeInForce::IOC),
            reduce_only: false,
        }
    }

    /// 포지션 청산용 reduce-only 시장가
    pub fn market_reduce_only(symbol: impl Into<String>, side: Side, quantity: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity: quantity.into(),
            price: None,
            time_in_force: None,
            reduce_only: true,
        }
    }

    pub fn to_params(&self) -> Params {
        let mut params = Params::new()
            .with("symbol", self.symbol.as_str())
            .with("side", self.side.as_str())
            .with("orderType", self.order_type.as_str())
            .with("quantity", self.quantity.as_str());
        if let Some(price) = self.price {
            params.insert("price", format_number(price));
        }
        if let Some(tif) = self.time_in_force {
            params.insert("timeInForce", tif.as_str());
        }
        if self.reduce_only {
            params.insert("reduceOnly", true);
        }
        params
    }
}

/// 가장 짧게 왕복 가능한 십진 표기 (`3.0` -> `"3"`, `20.5` -> `"20.5"`)
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}

/// 소수 둘째 자리 고정 (`0.5` -> `"0.50"`, `0.125` -> `"0.13"`)
///
/// f64 의 정확한 이진 값을 기준으로 반올림하고, 정확히 중간이면 0 에서 먼 쪽으로 올린다.
pub fn to_fixed2(value: f64) -> String {
    match Decimal::from_f64_retain(value) {
        Some(d) => format!("{:.2}", d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)),
        None => format!("{:.2}", value),
    }
}
