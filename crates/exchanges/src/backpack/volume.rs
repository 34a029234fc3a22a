//! 일일 거래대금 집계
//!
//! 캐시 없이 매번 체결 내역을 새로 조회해서 합산한다.

use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use interface::ExchangeError;

use super::params::Params;
use super::types::Fill;
use super::BackpackClient;

pub const DAY_MS: i64 = 86_400_000;

/// 한 번에 조회할 체결 수 (거래소 최대값)
const FILL_PAGE_LIMIT: u32 = 1000;

/// `now_ms` 가 속한 UTC 날짜의 00:00 (ms)
pub fn start_of_utc_day(now_ms: i64) -> i64 {
    now_ms - now_ms.rem_euclid(DAY_MS)
}

/// 다음 UTC 자정까지 남은 시간
pub fn until_next_utc_day(now_ms: i64) -> Duration {
    let next = start_of_utc_day(now_ms) + DAY_MS;
    Duration::from_millis((next - now_ms) as u64)
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// 매수/매도 구분 없이 `quantity * price` 합계. 수수료는 반영하지 않는다.
pub fn sum_notional(fills: &[Fill]) -> f64 {
    fills.iter().map(Fill::notional).sum()
}

impl BackpackClient {
    /// `from_ms` 부터 지금까지의 체결 대금
    pub async fn volume_since(&self, from_ms: i64) -> Result<f64, ExchangeError> {
        let to_ms = now_ms();
        let params = Params::new()
            .with("from", from_ms)
            .with("to", to_ms)
            .with("limit", FILL_PAGE_LIMIT);

        let fills = self.fill_history(params).await?;
        let volume = sum_notional(&fills);
        debug!(from_ms, to_ms, fills = fills.len(), volume, "volume since");
        Ok(volume)
    }

    /// 오늘(UTC) 거래대금
    pub async fn volume_today(&self) -> Result<f64, ExchangeError> {
        self.volume_since(start_of_utc_day(now_ms())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::decode;
    use serde_json::json;

    #[test]
    fn test_start_of_utc_day() {
        // 2023-11-14T22:13:20Z
        let now = 1_700_000_000_000;
        assert_eq!(start_of_utc_day(now), 1_699_920_000_000);
        assert_eq!(start_of_utc_day(1_699_920_000_000), 1_699_920_000_000);
        assert_eq!(start_of_utc_day(1_699_920_000_000 - 1), 1_699_920_000_000 - DAY_MS);
    }

    #[test]
    fn test_until_next_utc_day() {
        let now = 1_700_000_000_000;
        assert_eq!(until_next_utc_day(now), Duration::from_millis(6_400_000));
        assert_eq!(until_next_utc_day(1_699_920_000_000), Duration::from_millis(DAY_MS as u64));
    }

    #[test]
    fn test_sum_notional() {
        let fills: Vec<Fill> = decode(
            "fills",
            json!([
                {"symbol": "SOL_USDC", "side": "Bid", "price": 20, "quantity": 0.5},
                {"symbol": "SOL_USDC", "side": "Ask", "price": 21, "quantity": 1}
            ]),
        )
        .unwrap();
        assert_eq!(sum_notional(&fills), 31.0);
        assert_eq!(sum_notional(&[]), 0.0);
    }
}
