//! 계정별 거래 루프를 독립 task 로 띄우고 이벤트를 모아 로그로 남긴다

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::account::Account;
use crate::bot::{BotError, TradingBot};

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Started { account: String, pair: String },
    Stopped { account: String, buys: u64, sells: u64 },
    /// 클라이언트 생성 실패(키쌍 불일치 등) 또는 치명적 에러로 루프 중단
    Aborted { account: String, error: String },
}

pub struct Supervisor {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
}

impl Supervisor {
    /// 계정마다 `BackpackClient` 와 `TradingBot` 을 만든다
    pub fn spawn(accounts: Vec<Account>) -> Self {
        Self::spawn_with(accounts, |account| {
            let client = account.client()?;
            let config = account.bot_config()?;
            Ok(TradingBot::new(Arc::new(client), config))
        })
    }

    pub fn spawn_with<F>(accounts: Vec<Account>, build: F) -> Self
    where
        F: Fn(&Account) -> Result<TradingBot, BotError>,
    {
        let cancel = CancellationToken::new();
        let (tx, events) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(accounts.len());

        for account in accounts {
            let label = account.label();
            let mut bot = match build(&account) {
                Ok(bot) => bot,
                Err(e) => {
                    // 재시도하지 않는다. 다른 계정은 계속 돈다.
                    let _ = tx.send(WorkerEvent::Aborted {
                        account: label,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let tx = tx.clone();
            let cancel = cancel.clone();
            let span = info_span!("account", account = %label);

            handles.push(tokio::spawn(
                async move {
                    let _ = tx.send(WorkerEvent::Started {
                        account: label.clone(),
                        pair: bot.config().pair.to_string(),
                    });

                    let event = match bot.run(cancel).await {
                        Ok(()) => WorkerEvent::Stopped {
                            account: label,
                            buys: bot.buys(),
                            sells: bot.sells(),
                        },
                        Err(e) => WorkerEvent::Aborted {
                            account: label,
                            error: e.to_string(),
                        },
                    };
                    let _ = tx.send(event);
                }
                .instrument(span),
            ));
        }

        Self {
            cancel,
            handles,
            events,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// 모든 루프에 종료 신호. 진행 중인 요청은 끝까지 간다.
    pub fn close_all(&self) {
        info!("close-all: 모든 계정 루프에 종료 신호");
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        self.events.recv().await
    }

    /// 모든 worker 가 끝날 때까지 이벤트를 로그로 남긴다
    pub async fn wait(mut self) -> Vec<WorkerEvent> {
        let mut seen = Vec::new();
        while let Some(event) = self.events.recv().await {
            log_event(&event);
            seen.push(event);
        }

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("worker task 비정상 종료: {}", e);
            }
        }
        seen
    }
}

fn log_event(event: &WorkerEvent) {
    match event {
        WorkerEvent::Started { account, pair } => info!(%account, %pair, "worker started"),
        WorkerEvent::Stopped { account, buys, sells } => {
            info!(%account, buys, sells, "worker stopped")
        }
        WorkerEvent::Aborted { account, error } => warn!(%account, %error, "worker aborted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use exchanges::backpack::{Balances, Order, OrderRequest, Position};
    use interface::ExchangeError;

    use crate::bot::BotConfig;
    use crate::trader::BackpackTrader;

    /// 항상 한도를 넘긴 상태라 주문을 내지 않고 자정까지 잠든다
    struct CappedTrader;

    #[async_trait]
    impl BackpackTrader for CappedTrader {
        async fn balances(&self) -> Result<Balances, ExchangeError> {
            Ok(Balances::default())
        }
        async fn last_price(&self, _symbol: &str) -> Result<f64, ExchangeError> {
            Ok(20.0)
        }
        async fn open_orders(&self, _symbol: &str) -> Result<Vec<Order>, ExchangeError> {
            Ok(Vec::new())
        }
        async fn cancel_open_orders(&self, _symbol: &str) -> Result<(), ExchangeError> {
            Ok(())
        }
        async fn execute_order(&self, _request: &OrderRequest) -> Result<Order, ExchangeError> {
            Err(ExchangeError::Other("no orders expected".to_string()))
        }
        async fn open_positions(&self) -> Result<Vec<Position>, ExchangeError> {
            Ok(Vec::new())
        }
        async fn volume_since(&self, _from_ms: i64) -> Result<f64, ExchangeError> {
            Ok(1_000_000.0)
        }
    }

    fn account(key: &str) -> Account {
        Account {
            api_key: key.to_string(),
            api_secret: "secret".to_string(),
            proxy: None,
            trade_amount: 10.0,
            max_volume_daily: 2000.0,
            trade_pair: "SOL_USDC".to_string(),
        }
    }

    #[tokio::test]
    async fn test_close_all_stops_every_worker() {
        let mut supervisor = Supervisor::spawn_with(vec![account("aaaa"), account("bbbb")], |account| {
            Ok(TradingBot::new(Arc::new(CappedTrader), account.bot_config()?))
        });
        assert_eq!(supervisor.worker_count(), 2);

        for _ in 0..2 {
            assert!(matches!(supervisor.next_event().await, Some(WorkerEvent::Started { .. })));
        }
        supervisor.close_all();

        let events = supervisor.wait().await;
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, WorkerEvent::Stopped { buys: 0, sells: 0, .. })));
    }

    #[tokio::test]
    async fn test_build_failure_is_reported_and_isolated() {
        let supervisor = Supervisor::spawn_with(vec![account("bad1"), account("good")], |account| {
            if account.api_key == "bad1" {
                return Err(BotError::Exchange(ExchangeError::KeyMismatch));
            }
            Ok(TradingBot::new(Arc::new(CappedTrader), BotConfig::new("SOL_USDC", 10.0, 2000.0)?))
        });
        assert_eq!(supervisor.worker_count(), 1);

        supervisor.close_all();
        let events = supervisor.wait().await;

        assert!(events.iter().any(|e| matches!(
            e,
            WorkerEvent::Aborted { account, error } if account == "bad1" && error.contains("key mismatch")
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, WorkerEvent::Stopped { account, .. } if account == "good")));
    }

    /// seed 가 다른 두 키에서 secret 과 public 을 하나씩 가져온다
    fn mismatched_account() -> Account {
        use base64::engine::general_purpose::STANDARD as BASE64;
        use base64::Engine;
        use ed25519_dalek::SigningKey;

        let secret = SigningKey::from_bytes(&[1u8; 32]);
        let other = SigningKey::from_bytes(&[2u8; 32]);
        Account {
            api_key: BASE64.encode(other.verifying_key().to_bytes()),
            api_secret: BASE64.encode(secret.to_bytes()),
            ..account("unused")
        }
    }

    #[tokio::test]
    async fn test_spawn_reports_key_mismatch_without_starting_a_worker() {
        let supervisor = Supervisor::spawn(vec![mismatched_account()]);
        assert_eq!(supervisor.worker_count(), 0);

        let events = supervisor.wait().await;
        assert!(
            matches!(&events[..], [WorkerEvent::Aborted { error, .. }] if error.contains("key mismatch")),
            "{:?}",
            events
        );
    }

    #[tokio::test]
    async fn test_spawn_reports_undecodable_secret() {
        let supervisor = Supervisor::spawn(vec![account("not-a-key")]);
        assert_eq!(supervisor.worker_count(), 0);

        let events = supervisor.wait().await;
        assert!(
            matches!(&events[..], [WorkerEvent::Aborted { error, .. }] if error.contains("invalid key")),
            "{:?}",
            events
        );
    }
}
