use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use interface::{ExchangeError, OrderStatus, Side};

use super::keys::KeyPair;
use super::normalize::normalize;
use super::params::Params;
use super::signer::{sign, DEFAULT_WINDOW_MS};
use super::types::{flexible_opt_f64, id_string};
use super::volume::now_ms;

pub const WS_URL: &str = "wss://ws.backpack.exchange";
pub const ORDER_UPDATE_STREAM: &str = "account.orderUpdate";

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Backpack 주문 업데이트 스트림: 서명된 SUBSCRIBE 후 이벤트를 핸들러로 넘긴다
pub struct OrderUpdateStream {
    keys: KeyPair,
    url: String,
    window_ms: u64,
}

impl OrderUpdateStream {
    pub fn new(keys: KeyPair) -> Self {
        Self {
            keys,
            url: WS_URL.to_string(),
            window_ms: DEFAULT_WINDOW_MS,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// `subscribe` instruction, 빈 params 로 REST 와 같은 방식으로 서명한 구독 프레임
    pub fn subscribe_frame(&self, timestamp_ms: i64) -> Value {
        let signature = sign(
            &Params::new(),
            self.keys.signing_key(),
            timestamp_ms,
            "subscribe",
            Some(self.window_ms),
        );
        json!({
            "method": "SUBSCRIBE",
            "params": [ORDER_UPDATE_STREAM],
            "signature": [
                self.keys.api_key(),
                signature,
                timestamp_ms.to_string(),
                self.window_ms.to_string(),
            ],
        })
    }

    /// `cancel` 이 올 때까지 수신한다. 연결이 끊기면 5초 뒤 재연결.
    pub async fn run<F>(&self, cancel: CancellationToken, mut handler: F)
    where
        F: FnMut(OrderStreamEvent) + Send,
    {
        while !cancel.is_cancelled() {
            match self.connect(&cancel, &mut handler).await {
                Ok(()) => warn!("Order update WebSocket 연결이 종료되었습니다"),
                Err(e) => error!("Order update WebSocket 오류: {}", e),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(RECONNECT_DELAY) => info!("Order update WebSocket 재연결 시도..."),
            }
        }
    }

    async fn connect<F>(&self, cancel: &CancellationToken, handler: &mut F) -> Result<(), ExchangeError>
    where
        F: FnMut(OrderStreamEvent) + Send,
    {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ExchangeError::Other(format!("WebSocket 연결 실패: {}", e)))?;
        let (mut write, mut read) = ws_stream.split();
        info!("Connected to BPX Websocket: {}", self.url);

        let frame = self.subscribe_frame(now_ms()).to_string();
        write
            .send(Message::Text(frame))
            .await
            .map_err(|e| ExchangeError::Other(format!("구독 요청 전송 실패: {}", e)))?;

        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                msg = read.next() => msg,
            };

            match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(event) = parse_message(&text) {
                        handler(event);
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        error!("Pong 전송 실패: {}", e);
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    return Err(ExchangeError::Other(format!("WebSocket 메시지 수신 오류: {}", e)));
                }
                Some(Ok(_)) => {}
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderStreamEvent {
    OrderUpdate(OrderUpdate),
    /// 구독 응답, 에러 프레임, 알 수 없는 이벤트
    Unknown(Value),
}

/// `account.orderUpdate` 페이로드. 거래소의 한 글자 필드명을 그대로 매핑한다.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderUpdate {
    /// orderAccepted, orderCancelled, orderExpired, orderFill, triggerPlaced, triggerFailed
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E", default)]
    pub event_time: Option<i64>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "i", deserialize_with = "id_string")]
    pub order_id: String,
    #[serde(rename = "S", default)]
    pub side: Option<Side>,
    #[serde(rename = "X", default)]
    pub status: Option<OrderStatus>,
    #[serde(rename = "q", default, deserialize_with = "flexible_opt_f64")]
    pub quantity: Option<f64>,
    #[serde(rename = "p", default, deserialize_with = "flexible_opt_f64")]
    pub price: Option<f64>,
    #[serde(rename = "z", default, deserialize_with = "flexible_opt_f64")]
    pub executed_quantity: Option<f64>,
    #[serde(rename = "l", default, deserialize_with = "flexible_opt_f64")]
    pub fill_quantity: Option<f64>,
    #[serde(rename = "L", default, deserialize_with = "flexible_opt_f64")]
    pub fill_price: Option<f64>,
}

/// `{"stream": "...", "data": {...}}` 프레임을 해석한다. JSON 이 아니면 None.
pub fn parse_message(text: &str) -> Option<OrderStreamEvent> {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!("Order update 메시지 파싱 실패: {} ({})", e, text);
            return None;
        }
    };

    let is_order_update = value
        .get("stream")
        .and_then(Value::as_str)
        .map(|s| s.starts_with(ORDER_UPDATE_STREAM))
        .unwrap_or(false);

    if is_order_update {
        if let Some(data) = value.get("data") {
            match serde_json::from_value::<OrderUpdate>(normalize(data.clone())) {
                Ok(update) => return Some(OrderStreamEvent::OrderUpdate(update)),
                Err(e) => warn!("Failed to parse orderUpdate: {} ({})", e, data),
            }
        }
    }

    Some(OrderStreamEvent::Unknown(value))
}
