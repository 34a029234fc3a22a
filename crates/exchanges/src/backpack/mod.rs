//! Backpack Exchange 클라이언트
//!
//! 호출 흐름: `BackpackClient::call` (재시도) -> 서명 -> `Transport::send` -> 정규화된 응답

pub mod instruction;
pub mod keys;
pub mod normalize;
pub mod params;
pub mod retry;
pub mod signer;
pub mod stream;
pub mod transport;
pub mod types;
pub mod volume;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use interface::ExchangeError;

pub use instruction::{Instruction, Visibility};
pub use keys::KeyPair;
pub use params::Params;
pub use retry::{backoff, DEFAULT_RETRIES, ORDER_RETRIES};
pub use stream::{OrderStreamEvent, OrderUpdate, OrderUpdateStream};
pub use transport::{normalize_proxy, ApiResponse, HttpTransport, Transport, DEFAULT_TIMEOUT};
pub use types::{
    format_number, to_fixed2, BalanceEntry, Balances, Fill, Order, OrderRequest, Position, Ticker,
};

use signer::{sign, DEFAULT_WINDOW_MS};
use types::decode;
use volume::now_ms;

/// 클라이언트 생성 옵션
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub proxy: Option<String>,
    /// 서명 유효 시간 (ms)
    pub window_ms: u64,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            window_ms: DEFAULT_WINDOW_MS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// 계정 하나에 대응하는 서명 클라이언트. 키쌍과 프록시는 생성 후 바뀌지 않는다.
#[derive(Clone)]
pub struct BackpackClient {
    keys: KeyPair,
    transport: Arc<dyn Transport>,
    window_ms: u64,
}

impl std::fmt::Debug for BackpackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackpackClient")
            .field("keys", &self.keys)
            .field("window_ms", &self.window_ms)
            .finish_non_exhaustive()
    }
}

impl BackpackClient {
    /// 키쌍이 맞지 않으면 네트워크 호출 전에 `KeyMismatch` 로 실패한다
    pub fn new(api_secret: &str, api_key: &str, proxy: Option<&str>) -> Result<Self, ExchangeError> {
        Self::with_options(
            api_secret,
            api_key,
            ClientOptions {
                proxy: proxy.map(str::to_string),
                ..ClientOptions::default()
            },
        )
    }

    pub fn with_options(api_secret: &str, api_key: &str, options: ClientOptions) -> Result<Self, ExchangeError> {
        let keys = KeyPair::new(api_secret, api_key)?;
        let transport = HttpTransport::new(options.proxy.as_deref(), options.timeout)?;
        Ok(Self {
            keys,
            transport: Arc::new(transport),
            window_ms: options.window_ms,
        })
    }

    /// 환경변수 `API_SECRET`, `API_KEY`, `PROXY_URL` 로 생성
    pub fn with_credentials() -> Result<Self, ExchangeError> {
        let api_secret = std::env::var("API_SECRET")
            .map_err(|_| ExchangeError::InvalidKey("API_SECRET is not set".to_string()))?;
        let api_key = std::env::var("API_KEY")
            .map_err(|_| ExchangeError::InvalidKey("API_KEY is not set".to_string()))?;
        let proxy = std::env::var("PROXY_URL").ok();
        Self::new(&api_secret, &api_key, proxy.as_deref())
    }

    /// 임의의 transport 를 쓰는 클라이언트. 키쌍 검증은 동일하게 먼저 한다.
    pub fn with_transport(
        api_secret: &str,
        api_key: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ExchangeError> {
        let keys = KeyPair::new(api_secret, api_key)?;
        Ok(Self {
            keys,
            transport,
            window_ms: DEFAULT_WINDOW_MS,
        })
    }

    pub fn window_ms(mut self, window_ms: u64) -> Self {
        self.window_ms = window_ms;
        self
    }

    pub fn api_key(&self) -> &str {
        self.keys.api_key()
    }

    /// 이름으로 instruction 을 찾아 호출한다. 모르는 이름은 I/O 없이 `InstructionNotFound`.
    pub async fn api(&self, name: &str, params: Params, retries: u32) -> Result<ApiResponse, ExchangeError> {
        let instruction: Instruction = name.parse()?;
        self.call(instruction, params, retries).await
    }

    /// 재시도 포함 호출. private 호출은 시도마다 timestamp 를 새로 찍어 다시 서명한다.
    pub async fn call(
        &self,
        instruction: Instruction,
        params: Params,
        retries: u32,
    ) -> Result<ApiResponse, ExchangeError> {
        let params = &params;
        retry::with_backoff(instruction.name(), retries, move || self.send_once(instruction, params)).await
    }

    async fn send_once(&self, instruction: Instruction, params: &Params) -> Result<ApiResponse, ExchangeError> {
        let headers = if instruction.is_private() {
            self.signed_headers(instruction, params, now_ms())
        } else {
            Vec::new()
        };
        self.transport.send(instruction, &headers, params).await
    }

    fn signed_headers(&self, instruction: Instruction, params: &Params, timestamp_ms: i64) -> Vec<(String, String)> {
        let signature = sign(
            params,
            self.keys.signing_key(),
            timestamp_ms,
            instruction.name(),
            Some(self.window_ms),
        );
        vec![
            ("X-Timestamp".to_string(), timestamp_ms.to_string()),
            ("X-Window".to_string(), self.window_ms.to_string()),
            ("X-API-Key".to_string(), self.keys.api_key().to_string()),
            ("X-Signature".to_string(), signature),
        ]
    }

    async fn call_json(&self, instruction: Instruction, params: Params, retries: u32) -> Result<Value, ExchangeError> {
        self.call(instruction, params, retries).await?.into_json()
    }

    async fn query(&self, instruction: Instruction, params: Params) -> Result<Value, ExchangeError> {
        self.call_json(instruction, params, DEFAULT_RETRIES).await
    }

    /// 주문 업데이트 WebSocket 스트림
    pub fn order_update_stream(&self) -> OrderUpdateStream {
        OrderUpdateStream::new(self.keys.clone())
    }

    // ---------- private ----------

    pub async fn balance(&self) -> Result<Balances, ExchangeError> {
        decode("balances", self.query(Instruction::BalanceQuery, Params::new()).await?)
    }

    pub async fn deposits(&self, params: Params) -> Result<Value, ExchangeError> {
        self.query(Instruction::DepositQueryAll, params).await
    }

    pub async fn deposit_address(&self, params: Params) -> Result<Value, ExchangeError> {
        self.query(Instruction::DepositAddressQuery, params).await
    }

    pub async fn withdrawals(&self, params: Params) -> Result<Value, ExchangeError> {
        self.query(Instruction::WithdrawalQueryAll, params).await
    }

    pub async fn withdraw(&self, params: Params) -> Result<Value, ExchangeError> {
        self.query(Instruction::Withdraw, params).await
    }

    pub async fn order_history(&self, params: Params) -> Result<Value, ExchangeError> {
        self.query(Instruction::OrderHistoryQueryAll, params).await
    }

    pub async fn fill_history(&self, params: Params) -> Result<Vec<Fill>, ExchangeError> {
        decode("fills", self.query(Instruction::FillHistoryQueryAll, params).await?)
    }

    pub async fn get_order(&self, params: Params) -> Result<Order, ExchangeError> {
        decode("order", self.query(Instruction::OrderQuery, params).await?)
    }

    /// 주문 실행은 재시도 3회
    pub async fn execute_order(&self, request: &OrderRequest) -> Result<Order, ExchangeError> {
        let value = self
            .call_json(Instruction::OrderExecute, request.to_params(), ORDER_RETRIES)
            .await?;
        decode("order", value)
    }

    pub async fn cancel_order(&self, params: Params) -> Result<Value, ExchangeError> {
        self.query(Instruction::OrderCancel, params).await
    }

    pub async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError> {
        let params = Params::new().with("symbol", symbol);
        decode("open orders", self.query(Instruction::OrderQueryAll, params).await?)
    }

    pub async fn cancel_open_orders(&self, symbol: &str) -> Result<Value, ExchangeError> {
        let params = Params::new().with("symbol", symbol);
        self.query(Instruction::OrderCancelAll, params).await
    }

    pub async fn positions(&self) -> Result<Vec<Position>, ExchangeError> {
        decode("positions", self.query(Instruction::PositionQuery, Params::new()).await?)
    }

    // ---------- public ----------

    pub async fn assets(&self) -> Result<Value, ExchangeError> {
        self.query(Instruction::Assets, Params::new()).await
    }

    pub async fn markets(&self) -> Result<Value, ExchangeError> {
        self.query(Instruction::Markets, Params::new()).await
    }

    pub async fn ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let params = Params::new().with("symbol", symbol);
        decode("ticker", self.query(Instruction::Ticker, params).await?)
    }

    pub async fn depth(&self, params: Params) -> Result<Value, ExchangeError> {
        self.query(Instruction::Depth, params).await
    }

    pub async fn klines(&self, params: Params) -> Result<Value, ExchangeError> {
        self.query(Instruction::Klines, params).await
    }

    pub async fn status(&self) -> Result<Value, ExchangeError> {
        self.query(Instruction::Status, Params::new()).await
    }

    pub async fn ping(&self) -> Result<Value, ExchangeError> {
        self.query(Instruction::Ping, Params::new()).await
    }

    pub async fn time(&self) -> Result<Value, ExchangeError> {
        self.query(Instruction::Time, Params::new()).await
    }

    pub async fn recent_trades(&self, params: Params) -> Result<Value, ExchangeError> {
        self.query(Instruction::Trades, params).await
    }

    pub async fn historical_trades(&self, params: Params) -> Result<Value, ExchangeError> {
        self.query(Instruction::TradesHistory, params).await
    }
}
