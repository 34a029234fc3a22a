use async_trait::async_trait;
use tracing::info;

use exchanges::backpack::{Balances, Order, OrderRequest, Position};
use exchanges::BackpackClient;
use interface::ExchangeError;

use super::BackpackTrader;

#[async_trait]
impl BackpackTrader for BackpackClient {
    async fn balances(&self) -> Result<Balances, ExchangeError> {
        self.balance().await
    }

    async fn last_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        Ok(self.ticker(symbol).await?.last_price)
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError> {
        BackpackClient::open_orders(self, symbol).await
    }

    async fn cancel_open_orders(&self, symbol: &str) -> Result<(), ExchangeError> {
        let response = BackpackClient::cancel_open_orders(self, symbol).await?;
        info!("cancel_open_orders response: {}", response);
        Ok(())
    }

    async fn execute_order(&self, request: &OrderRequest) -> Result<Order, ExchangeError> {
        info!(
            symbol = %request.symbol,
            side = %request.side,
            quantity = %request.quantity,
            price = ?request.price,
            reduce_only = request.reduce_only,
            "execute_order"
        );
        BackpackClient::execute_order(self, request).await
    }

    async fn open_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        self.positions().await
    }

    async fn volume_since(&self, from_ms: i64) -> Result<f64, ExchangeError> {
        BackpackClient::volume_since(self, from_ms).await
    }
}
