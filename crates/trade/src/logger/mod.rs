use std::io;
use std::path::Path;

use tracing_appender::non_blocking;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_DIR: &str = "logs";
pub const LOG_PREFIX: &str = "backpack";

/// drop 되면 남은 로그를 flush 하고 writer 가 멈춘다. main 에서 끝까지 들고 있어야 한다.
pub struct TracingGuards {
    _file: WorkerGuard,
    _stdout: WorkerGuard,
}

/// stdout(ANSI) + 날짜별 파일 로깅
///
/// `RUST_LOG` 가 없으면 info 레벨. 파일에는 항상 info 이상만 기록한다.
pub fn init_tracing() -> io::Result<TracingGuards> {
    let (file_writer, file_guard) = daily_file_writer(Path::new(LOG_DIR), LOG_PREFIX)?;
    let (stdout_writer, stdout_guard) = non_blocking(io::stdout());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(EnvFilter::new("info")),
        )
        .with(fmt::layer().with_writer(stdout_writer).with_ansi(true))
        .init();

    Ok(TracingGuards {
        _file: file_guard,
        _stdout: stdout_guard,
    })
}

/// `<dir>/<prefix>.<YYYY-MM-DD>.log`, UTC 자정마다 새 파일
fn daily_file_writer(dir: &Path, prefix: &str) -> io::Result<(NonBlocking, WorkerGuard)> {
    let appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    Ok(non_blocking(appender))
}
