use std::fmt;

use serde::{Deserialize, Serialize};

mod error;

pub use error::ExchangeError;

/// 주문 방향. Backpack 은 매수를 `Bid`, 매도를 `Ask` 로 표기한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "Bid",
            Side::Ask => "Ask",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "Limit",
            OrderType::Market => "Market",
        }
    }
}

/// 주문 유효 기간
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled
    GTC,
    /// Immediate-or-cancel: 즉시 체결 가능한 만큼만 체결하고 잔량은 취소
    IOC,
    /// Fill-or-kill
    FOK,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::GTC => "GTC",
            TimeInForce::IOC => "IOC",
            TimeInForce::FOK => "FOK",
        }
    }
}

/// 거래소가 돌려주는 주문 상태.
/// `Filled` 만 성공으로 취급하고 나머지는 모두 실패로 본다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Cancelled,
    Expired,
    Filled,
    New,
    PartiallyFilled,
    TriggerPending,
    TriggerFailed,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 거래쌍 종류. 심볼이 `_PERP` 로 끝나면 무기한 선물이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketKind {
    Spot,
    Perpetual,
}

impl MarketKind {
    pub const PERP_SUFFIX: &'static str = "_PERP";

    pub fn of_symbol(symbol: &str) -> Self {
        if symbol.ends_with(Self::PERP_SUFFIX) {
            MarketKind::Perpetual
        } else {
            MarketKind::Spot
        }
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketKind::Spot => "spot",
            MarketKind::Perpetual => "perp",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_kind_of_symbol() {
        assert_eq!(MarketKind::of_symbol("SOL_USDC"), MarketKind::Spot);
        assert_eq!(MarketKind::of_symbol("SOL_USDC_PERP"), MarketKind::Perpetual);
    }

    #[test]
    fn test_order_status_unknown_fallback() {
        let status: OrderStatus = serde_json::from_str("\"Rejected\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);

        let status: OrderStatus = serde_json::from_str("\"Filled\"").unwrap();
        assert_eq!(status, OrderStatus::Filled);
    }

    #[test]
    fn test_side_wire_names() {
        assert_eq!(serde_json::to_string(&Side::Bid).unwrap(), "\"Bid\"");
        assert_eq!(Side::Ask.to_string(), "Ask");
    }
}
