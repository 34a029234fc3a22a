use std::fmt;

use exchanges::backpack::to_fixed2;
use interface::MarketKind;

/// 이 금액(quote)보다 많으면 매수, 아니면 보유분 매도
pub const MIN_QUOTE_FOR_BUY: f64 = 5.0;
/// 매수 시 남겨두는 quote 잔고
pub const QUOTE_RESERVE: f64 = 2.0;
/// 매도 시 남겨두는 base 잔고
pub const BASE_RESERVE: f64 = 0.02;
/// 무기한 선물 최소 주문 금액
pub const PERP_MIN_NOTIONAL: f64 = 5.0;
/// 최소 주문 금액 미만일 때 대신 쓰는 금액
pub const PERP_FALLBACK_NOTIONAL: f64 = 5.1;

/// `BASE_QUOTE` 또는 `BASE_QUOTE_PERP`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradePair {
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub kind: MarketKind,
}

impl TradePair {
    pub fn parse(symbol: &str) -> Option<Self> {
        let symbol = symbol.trim();
        let kind = MarketKind::of_symbol(symbol);
        let body = symbol.strip_suffix(MarketKind::PERP_SUFFIX).unwrap_or(symbol);

        let (base, quote) = body.split_once('_')?;
        if base.is_empty() || quote.is_empty() || quote.contains('_') {
            return None;
        }

        Some(Self {
            symbol: symbol.to_string(),
            base: base.to_string(),
            quote: quote.to_string(),
            kind,
        })
    }

    pub fn is_perpetual(&self) -> bool {
        self.kind == MarketKind::Perpetual
    }
}

impl fmt::Display for TradePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// 현물 매수 수량: `min(trade_amount, quote_available - 2) / price`, 소수 둘째 자리
pub fn spot_buy_quantity(quote_available: f64, trade_amount: f64, price: f64) -> String {
    let amount = trade_amount.min(quote_available - QUOTE_RESERVE);
    to_fixed2(amount / price)
}

/// 현물 매도 수량: `base_available - 0.02`. 팔 것이 없으면 None.
pub fn spot_sell_quantity(base_available: f64) -> Option<String> {
    let quantity = base_available - BASE_RESERVE;
    if quantity <= 0.0 {
        return None;
    }
    Some(to_fixed2(quantity))
}

/// 무기한 선물 진입 금액: `min(trade_amount, quote_available)`, 최소 금액 미만이면 5.1
pub fn perp_entry_notional(quote_available: f64, trade_amount: f64) -> f64 {
    let notional = trade_amount.min(quote_available);
    if notional < PERP_MIN_NOTIONAL {
        PERP_FALLBACK_NOTIONAL
    } else {
        notional
    }
}

/// "0.00" 처럼 0으로 반올림된 수량인지
pub fn is_zero_quantity(quantity: &str) -> bool {
    quantity.parse::<f64>().map(|q| q <= 0.0).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trade_pair() {
        let perp = TradePair::parse("SOL_USDC_PERP").unwrap();
        assert_eq!(perp.base, "SOL");
        assert_eq!(perp.quote, "USDC");
        assert!(perp.is_perpetual());

        let spot = TradePair::parse("SOL_USDC").unwrap();
        assert_eq!(spot.symbol, "SOL_USDC");
        assert!(!spot.is_perpetual());

        assert!(TradePair::parse("SOLUSDC").is_none());
        assert!(TradePair::parse("_USDC").is_none());
        assert!(TradePair::parse("A_B_C").is_none());
    }

    #[test]
    fn test_spot_buy_quantity() {
        assert_eq!(spot_buy_quantity(100.0, 10.0, 20.0), "0.50");
        // 잔고 8 -> 8 - 2 = 6 으로 제한
        assert_eq!(spot_buy_quantity(8.0, 10.0, 20.0), "0.30");
        // 0.125, 0.625 는 올림
        assert_eq!(spot_buy_quantity(100.0, 10.0, 80.0), "0.13");
        assert_eq!(spot_buy_quantity(100.0, 10.0, 16.0), "0.63");
    }

    #[test]
    fn test_spot_sell_quantity() {
        assert_eq!(spot_sell_quantity(1.02).as_deref(), Some("1.00"));
        assert_eq!(spot_sell_quantity(0.02), None);
        assert_eq!(spot_sell_quantity(0.0), None);
    }

    #[test]
    fn test_perp_entry_notional() {
        assert_eq!(perp_entry_notional(100.0, 10.0), 10.0);
        assert_eq!(perp_entry_notional(7.0, 10.0), 7.0);
        assert_eq!(perp_entry_notional(3.0, 10.0), 5.1);
        assert_eq!(perp_entry_notional(100.0, 4.0), 5.1);
    }

    #[test]
    fn test_zero_quantity() {
        assert!(is_zero_quantity("0.00"));
        assert!(is_zero_quantity("-0.10"));
        assert!(!is_zero_quantity("0.01"));
    }
}
