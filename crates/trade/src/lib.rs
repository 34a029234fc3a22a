pub mod account;
pub mod bot;
pub mod logger;
pub mod supervisor;
pub mod trader;

pub use account::Account;
pub use bot::{BotConfig, BotError, StepOutcome, TradingBot};
pub use supervisor::{Supervisor, WorkerEvent};
pub use trader::BackpackTrader;

use std::sync::Once;

static INIT: Once = Once::new();

/// .env 파일의 환경변수를 로드한다
fn init() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
    });
}

// 라이브러리 로드 시 자동 초기화
#[ctor::ctor]
fn setup() {
    init();
}
