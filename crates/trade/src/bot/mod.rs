//! 일일 거래대금 한도가 있는 매수/매도/청산 루프
//!
//! 한 번의 `step` 은 거래대금 확인 -> 미체결 주문 취소 -> 잔고/가격 조회 -> 주문 순서로 진행된다.
//! `run` 은 `step` 사이의 대기와 에러 복구를 담당한다.

pub mod sizing;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use exchanges::backpack::volume::{now_ms, start_of_utc_day, until_next_utc_day};
use exchanges::backpack::{format_number, to_fixed2, Order, OrderRequest};
use interface::{ExchangeError, OrderStatus, Side};

use crate::trader::BackpackTrader;

pub use sizing::TradePair;
use sizing::{
    is_zero_quantity, perp_entry_notional, spot_buy_quantity, spot_sell_quantity, MIN_QUOTE_FOR_BUY,
};

pub const SPOT_INTERVAL: Duration = Duration::from_secs(10);
pub const PERP_INTERVAL: Duration = Duration::from_secs(5);
pub const ERROR_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("order {order_id} not filled as {expected}: side={side} status={status}")]
    NotFilled {
        order_id: String,
        expected: Side,
        side: Side,
        status: OrderStatus,
    },

    #[error("nothing to sell: {asset} available={available}")]
    NothingToSell { asset: String, available: f64 },

    #[error("order quantity rounds to zero: {0}")]
    OrderTooSmall(String),

    #[error("invalid trade pair {0}")]
    InvalidPair(String),
}

impl BotError {
    /// 루프를 멈추고 supervisor 에 올려야 하는 에러
    pub fn is_fatal(&self) -> bool {
        match self {
            BotError::Exchange(e) => e.is_fatal(),
            BotError::InvalidPair(_) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub pair: TradePair,
    /// 한 번에 주문할 quote 금액
    pub trade_amount: f64,
    /// UTC 하루 거래대금 한도
    pub max_volume_daily: f64,
}

impl BotConfig {
    pub fn new(trade_pair: &str, trade_amount: f64, max_volume_daily: f64) -> Result<Self, BotError> {
        let pair = TradePair::parse(trade_pair).ok_or_else(|| BotError::InvalidPair(trade_pair.to_string()))?;
        Ok(Self {
            pair,
            trade_amount,
            max_volume_daily,
        })
    }

    pub fn interval(&self) -> Duration {
        if self.pair.is_perpetual() {
            PERP_INTERVAL
        } else {
            SPOT_INTERVAL
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// 주문이 전량 체결되었다
    Traded { side: Side, order_id: String },
    /// 오늘 한도를 넘었다. `resume_in` 뒤(다음 UTC 자정)에 다시 확인한다.
    VolumeCapped { volume: f64, resume_in: Duration },
}

/// 계정 하나의 거래 상태 머신. 카운터는 인스턴스가 소유한다.
pub struct TradingBot {
    trader: Arc<dyn BackpackTrader>,
    config: BotConfig,
    buys: u64,
    sells: u64,
}

impl TradingBot {
    pub fn new(trader: Arc<dyn BackpackTrader>, config: BotConfig) -> Self {
        Self {
            trader,
            config,
            buys: 0,
            sells: 0,
        }
    }

    pub fn buys(&self) -> u64 {
        self.buys
    }

    pub fn sells(&self) -> u64 {
        self.sells
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// `cancel` 이 올 때까지 반복한다. 진행 중인 요청은 끊지 않고 다음 step 만 막는다.
    /// 치명적인 에러만 밖으로 돌려준다.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), BotError> {
        info!(
            pair = %self.config.pair,
            trade_amount = self.config.trade_amount,
            max_volume_daily = self.config.max_volume_daily,
            "거래 루프 시작"
        );

        while !cancel.is_cancelled() {
            let pause = match self.step().await {
                Ok(StepOutcome::Traded { side, order_id }) => {
                    info!(%side, %order_id, "주문 체결");
                    self.config.interval()
                }
                Ok(StepOutcome::VolumeCapped { volume, resume_in }) => {
                    info!(
                        volume,
                        max_volume_daily = self.config.max_volume_daily,
                        "오늘 거래대금 한도 도달. 다음 UTC 자정까지 대기 ({}s)",
                        resume_in.as_secs()
                    );
                    resume_in
                }
                Err(e) if e.is_fatal() => {
                    error!("복구할 수 없는 에러로 거래 루프 중단: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("거래 실패: {}", e);
                    ERROR_DELAY
                }
            };

            info!(
                buys = self.buys,
                sells = self.sells,
                "Sleeping for {}ms",
                pause.as_millis()
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!(buys = self.buys, sells = self.sells, "거래 루프 종료");
        Ok(())
    }

    /// 한 번의 판단과 주문
    pub async fn step(&mut self) -> Result<StepOutcome, BotError> {
        let now = now_ms();
        let volume = self.trader.volume_since(start_of_utc_day(now)).await?;
        info!(volume, max_volume_daily = self.config.max_volume_daily, "오늘 거래대금");

        if volume > self.config.max_volume_daily {
            if self.config.pair.is_perpetual() {
                self.close_positions().await?;
            }
            return Ok(StepOutcome::VolumeCapped {
                volume,
                resume_in: until_next_utc_day(now),
            });
        }

        if self.config.pair.is_perpetual() {
            self.perp_step().await
        } else {
            self.spot_step().await
        }
    }

    async fn spot_step(&mut self) -> Result<StepOutcome, BotError> {
        let pair = &self.config.pair;

        let open_orders = self.trader.open_orders(&pair.symbol).await?;
        if !open_orders.is_empty() {
            info!(count = open_orders.len(), "미체결 주문 취소");
            self.trader.cancel_open_orders(&pair.symbol).await?;
        }

        let balances = self.trader.balances().await?;
        let quote_available = balances.available(&pair.quote);
        let base_available = balances.available(&pair.base);
        let price = self.trader.last_price(&pair.symbol).await?;
        info!(
            "{} 잔고 {}, {} 잔고 {}, 현재가 {}",
            pair.quote, quote_available, pair.base, base_available, price
        );

        let request = if quote_available > MIN_QUOTE_FOR_BUY {
            let quantity = spot_buy_quantity(quote_available, self.config.trade_amount, price);
            OrderRequest::limit_ioc(pair.symbol.as_str(), Side::Bid, quantity, price)
        } else {
            let quantity = spot_sell_quantity(base_available).ok_or_else(|| BotError::NothingToSell {
                asset: pair.base.clone(),
                available: base_available,
            })?;
            OrderRequest::limit_ioc(pair.symbol.as_str(), Side::Ask, quantity, price)
        };

        let order = self.submit(&request).await?;
        Ok(StepOutcome::Traded {
            side: request.side,
            order_id: order.id,
        })
    }

    async fn perp_step(&mut self) -> Result<StepOutcome, BotError> {
        let symbol = self.config.pair.symbol.clone();

        self.trader.cancel_open_orders(&symbol).await?;
        self.close_positions().await?;

        let balances = self.trader.balances().await?;
        let quote_available = balances.available(&self.config.pair.quote);
        let price = self.trader.last_price(&symbol).await?;
        info!("{} 잔고 {}, 현재가 {}", self.config.pair.quote, quote_available, price);

        let notional = perp_entry_notional(quote_available, self.config.trade_amount);
        let quantity = to_fixed2(notional / price);
        let request = OrderRequest::limit_ioc(symbol, Side::Bid, quantity, price);

        let order = self.submit(&request).await?;
        Ok(StepOutcome::Traded {
            side: Side::Bid,
            order_id: order.id,
        })
    }

    /// 이 페어의 열린 포지션을 reduce-only 시장가로 모두 닫는다
    async fn close_positions(&mut self) -> Result<(), BotError> {
        let symbol = &self.config.pair.symbol;
        let positions: Vec<_> = self
            .trader
            .open_positions()
            .await?
            .into_iter()
            .filter(|p| &p.symbol == symbol && p.is_open())
            .collect();

        for position in positions {
            let side = if position.net_quantity > 0.0 { Side::Ask } else { Side::Bid };
            let quantity = format_number(position.net_quantity.abs());
            info!(net_quantity = position.net_quantity, %side, "포지션 청산");

            let request = OrderRequest::market_reduce_only(position.symbol.as_str(), side, quantity);
            self.submit(&request).await?;
        }
        Ok(())
    }

    /// 주문을 넣고 기대한 방향으로 전량 체결되었는지 확인한다
    async fn submit(&mut self, request: &OrderRequest) -> Result<Order, BotError> {
        if is_zero_quantity(&request.quantity) {
            return Err(BotError::OrderTooSmall(request.quantity.clone()));
        }

        info!(
            "{} {} {} @ {:?}",
            request.side, request.quantity, request.symbol, request.price
        );
        let order = self.trader.execute_order(request).await?;

        if !order.is_filled_as(request.side) {
            return Err(BotError::NotFilled {
                order_id: order.id,
                expected: request.side,
                side: order.side,
                status: order.status,
            });
        }

        match request.side {
            Side::Bid => self.buys += 1,
            Side::Ask => self.sells += 1,
        }
        info!(buys = self.buys, sells = self.sells, "{} 체결", request.side);
        Ok(order)
    }
}
