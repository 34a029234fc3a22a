use std::future::Future;
use std::time::Duration;

use tracing::warn;

use interface::ExchangeError;

/// 조회성 호출의 기본 재시도 횟수
pub const DEFAULT_RETRIES: u32 = 10;
/// 주문 실행은 중복 체결 위험이 있어 재시도를 줄인다
pub const ORDER_RETRIES: u32 = 3;

const BACKOFF_EXPONENT: f64 = 1.5;

/// `attempt` 번째 재시도 전 대기 시간 (`attempt ^ 1.5` 초). attempt 는 1부터 시작.
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_secs_f64(f64::from(attempt).powf(BACKOFF_EXPONENT))
}

/// `op` 를 최대 `1 + retries` 번 호출한다.
///
/// 재시도 불가능한 에러는 즉시, 예산이 바닥나면 마지막 에러를 그대로 돌려준다.
pub async fn with_backoff<T, F, Fut>(method: &str, retries: u32, mut op: F) -> Result<T, ExchangeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExchangeError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retries && e.is_retryable() => {
                attempt += 1;
                let delay = backoff(attempt);
                warn!(
                    method,
                    attempt,
                    backoff_secs = delay.as_secs_f64(),
                    body = e.body().unwrap_or(""),
                    "BPX api error: {}",
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_backoff_schedule() {
        let expected = [1.0, 2.828_427, 5.196_152, 8.0, 11.180_339];
        for (i, want) in expected.iter().enumerate() {
            let got = backoff(i as u32 + 1).as_secs_f64();
            assert!((got - want).abs() < 1e-5, "attempt {}: {} != {}", i + 1, got, want);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reraises_last_error_unchanged() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), _> = with_backoff("orderExecute", ORDER_RETRIES, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(ExchangeError::Other(format!("failure #{}", n))) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), ORDER_RETRIES + 1);
        match result {
            Err(ExchangeError::Other(msg)) => assert_eq!(msg, "failure #4"),
            other => panic!("unexpected {:?}", other),
        }

        // 1 + 2.83 + 5.20 초
        let waited = started.elapsed().as_secs_f64();
        assert!((waited - 9.024).abs() < 0.05, "waited {}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);

        let result = with_backoff("balanceQuery", DEFAULT_RETRIES, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ExchangeError::Decode("truncated".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), _> = with_backoff("ticker", DEFAULT_RETRIES, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ExchangeError::UnknownApi) }
        })
        .await;

        assert!(matches!(result, Err(ExchangeError::UnknownApi)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_calls_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff("ping", 0, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ExchangeError::Other("down".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
