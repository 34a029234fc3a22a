use std::path::PathBuf;

use color_eyre::eyre;
use structopt::StructOpt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use exchanges::backpack::OrderStreamEvent;
use trade::account::{self, Account};
use trade::logger;
use trade::Supervisor;

// lib.rs에서 자동으로 dotenv가 로드됨

#[derive(Debug, StructOpt)]
#[structopt(name = "trade", about = "Backpack 거래량 봇")]
enum Command {
    /// 계정별 거래 루프 실행 (Ctrl-C 로 종료)
    Run {
        /// 계정 CSV. 없으면 환경변수의 단일 계정.
        #[structopt(long, parse(from_os_str))]
        accounts: Option<PathBuf>,
    },
    /// 계정별 오늘(UTC) 거래량 조회
    Volume {
        #[structopt(long, parse(from_os_str))]
        accounts: Option<PathBuf>,
    },
    /// 주문 업데이트 스트림 구독
    WatchOrders,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let _guards = logger::init_tracing()?;

    match Command::from_args() {
        Command::Run { accounts } => run_bots(load_accounts(accounts)?).await,
        Command::Volume { accounts } => print_volumes(load_accounts(accounts)?).await,
        Command::WatchOrders => watch_orders().await,
    }
}

fn load_accounts(path: Option<PathBuf>) -> eyre::Result<Vec<Account>> {
    let accounts = match path {
        Some(path) => account::load_csv(&path)?,
        None => vec![Account::from_env()?],
    };
    if accounts.is_empty() {
        eyre::bail!("no accounts configured");
    }
    info!("{}개 계정 로드", accounts.len());
    Ok(accounts)
}

async fn run_bots(accounts: Vec<Account>) -> eyre::Result<()> {
    let supervisor = Supervisor::spawn(accounts);
    let cancel = supervisor.cancel_token();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C 수신, 종료 중...");
            cancel.cancel();
        }
    });

    let events = supervisor.wait().await;
    info!("모든 계정 루프 종료 ({} events)", events.len());
    Ok(())
}

async fn print_volumes(accounts: Vec<Account>) -> eyre::Result<()> {
    for account in accounts {
        let label = account.label();
        let client = match account.client() {
            Ok(client) => client,
            Err(e) => {
                warn!("[{}] 클라이언트 생성 실패: {}", label, e);
                continue;
            }
        };

        match client.volume_today().await {
            Ok(volume) => info!(
                "[{}] 오늘 거래량 {:.2} / {} ({})",
                label, volume, account.max_volume_daily, account.trade_pair
            ),
            Err(e) => warn!("[{}] 거래량 조회 실패: {}", label, e),
        }
    }
    Ok(())
}

async fn watch_orders() -> eyre::Result<()> {
    let client = exchanges::BackpackClient::with_credentials()?;
    let cancel = CancellationToken::new();

    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.cancel();
        }
    });

    client
        .order_update_stream()
        .run(cancel, |event| match event {
            OrderStreamEvent::OrderUpdate(update) => info!(
                "{} {} id={} status={:?} filled={:?}@{:?}",
                update.event_type,
                update.symbol,
                update.order_id,
                update.status,
                update.fill_quantity,
                update.fill_price
            ),
            OrderStreamEvent::Unknown(value) => info!("{}", value),
        })
        .await;

    Ok(())
}
