pub mod backpack;

use async_trait::async_trait;
use exchanges::backpack::{Balances, Order, OrderRequest, Position};
use interface::ExchangeError;

/// 거래 루프가 거래소에 요구하는 최소한의 인터페이스.
/// 실제 구현은 `BackpackClient`, 테스트에서는 인메모리 구현을 쓴다.
#[async_trait]
pub trait BackpackTrader: Send + Sync {
    async fn balances(&self) -> Result<Balances, ExchangeError>;
    async fn last_price(&self, symbol: &str) -> Result<f64, ExchangeError>;
    async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError>;
    async fn cancel_open_orders(&self, symbol: &str) -> Result<(), ExchangeError>;
    async fn execute_order(&self, request: &OrderRequest) -> Result<Order, ExchangeError>;
    async fn open_positions(&self) -> Result<Vec<Position>, ExchangeError>;
    /// `from_ms` 부터 지금까지의 체결 대금
    async fn volume_since(&self, from_ms: i64) -> Result<f64, ExchangeError>;
}
