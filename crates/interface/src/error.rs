use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 개인키에서 유도한 공개키가 설정된 공개키와 다르다. 클라이언트 생성 시점에만 발생.
    #[error("key mismatch: public key derived from the secret does not match the api key")]
    KeyMismatch,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("instruction {0} not found")]
    InstructionNotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: url={url} body={body}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },

    /// 거래소가 응답 본문의 `error` 배열로 보고한 비즈니스 에러
    #[error("url={url} body={} err={}", .body.as_deref().unwrap_or("undefined"), .codes.join(", "))]
    Api {
        codes: Vec<String>,
        url: String,
        body: Option<String>,
    },

    #[error("Backpack API returned an unknown error")]
    UnknownApi,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl ExchangeError {
    /// 재시도해도 의미가 있는 에러인지
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Http(_)
                | ExchangeError::HttpStatus { .. }
                | ExchangeError::Api { .. }
                | ExchangeError::Decode(_)
                | ExchangeError::Other(_)
        )
    }

    /// 계정 루프를 중단시켜야 하는 에러 (설정/프로그래밍 오류)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExchangeError::KeyMismatch
                | ExchangeError::InvalidKey(_)
                | ExchangeError::InstructionNotFound(_)
        )
    }

    /// 응답 본문이 있으면 돌려준다. 재시도 로그에 사용.
    pub fn body(&self) -> Option<&str> {
        match self {
            ExchangeError::HttpStatus { body, .. } => Some(body.as_str()),
            ExchangeError::Api { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}
