use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Proxy};
use serde_json::Value;
use tracing::debug;

use interface::ExchangeError;

use super::instruction::Instruction;
use super::normalize::normalize;
use super::params::Params;

pub const BASE_URL: &str = "https://api.backpack.exchange/";
pub const USER_AGENT: &str = "Backpack Rust API Client";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// content-type 별로 나뉜 응답
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// 숫자 문자열 정규화를 거친 JSON
    Json(Value),
    /// text/plain 본문 그대로
    Text(String),
    Raw {
        status: u16,
        content_type: Option<String>,
        body: Vec<u8>,
    },
}

impl ApiResponse {
    pub fn into_json(self) -> Result<Value, ExchangeError> {
        match self {
            ApiResponse::Json(value) => Ok(value),
            ApiResponse::Text(text) => Ok(Value::String(text)),
            ApiResponse::Raw { content_type, .. } => Err(ExchangeError::Decode(format!(
                "expected a JSON response, got content-type {}",
                content_type.as_deref().unwrap_or("none")
            ))),
        }
    }
}

/// 한 번의 HTTP 호출. 재시도는 하지 않는다.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        instruction: Instruction,
        headers: &[(String, String)],
        params: &Params,
    ) -> Result<ApiResponse, ExchangeError>;
}

/// `proxy` 에 스킴이 없으면 `http://` 를 붙인다
pub fn normalize_proxy(proxy: &str) -> String {
    let proxy = proxy.trim();
    if proxy.starts_with("http://") || proxy.starts_with("https://") || proxy.starts_with("socks5://") {
        proxy.to_string()
    } else {
        format!("http://{}", proxy)
    }
}

/// reqwest 기반 구현체. 프록시는 클라이언트 단위로 한 번 붙고 모든 호출에서 재사용된다.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(proxy: Option<&str>, timeout: Duration) -> Result<Self, ExchangeError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout);

        if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
            let proxy = Proxy::all(normalize_proxy(proxy))
                .map_err(|e| ExchangeError::Other(format!("invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: BASE_URL.to_string(),
        })
    }

    /// 테스트나 다른 엔드포인트를 위해 base url 을 바꾼다
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn url_of(&self, instruction: Instruction) -> String {
        format!("{}{}", self.base_url, instruction.path())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        instruction: Instruction,
        headers: &[(String, String)],
        params: &Params,
    ) -> Result<ApiResponse, ExchangeError> {
        let url = self.url_of(instruction);
        let method = instruction.method();

        let (request, body) = if method == Method::GET {
            let full_url = if params.is_empty() {
                url.clone()
            } else {
                format!("{}?{}", url, params.to_query())
            };
            let request = self
                .http
                .get(full_url)
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE);
            (request, None)
        } else {
            let body = params.to_json();
            let request = self
                .http
                .request(method.clone(), &url)
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(body.clone());
            (request, Some(body))
        };

        let request = headers
            .iter()
            .fold(request, |req, (name, value)| req.header(name.as_str(), value.as_str()));

        debug!(%method, %url, instruction = instruction.name(), "backpack request");

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExchangeError::HttpStatus {
                status: status.as_u16(),
                url,
                body: text,
            });
        }

        match content_type.as_deref() {
            Some(ct) if ct.contains("application/json") => {
                let text = response.text().await?;
                let parsed: Value = serde_json::from_str(&text)
                    .map_err(|e| ExchangeError::Decode(format!("{}: {}", e, text)))?;
                let parsed = normalize(parsed);
                check_error_array(&parsed, &url, body)?;
                Ok(ApiResponse::Json(parsed))
            }
            Some(ct) if ct.contains("text/plain") => Ok(ApiResponse::Text(response.text().await?)),
            _ => Ok(ApiResponse::Raw {
                status: status.as_u16(),
                content_type,
                body: response.bytes().await?.to_vec(),
            }),
        }
    }
}

/// 본문에 비어 있지 않은 `error` 배열이 있으면 `E` 로 시작하는 항목을 에러 코드로 본다
fn check_error_array(parsed: &Value, url: &str, body: Option<String>) -> Result<(), ExchangeError> {
    let Some(entries) = parsed.get("error").and_then(Value::as_array) else {
        return Ok(());
    };
    if entries.is_empty() {
        return Ok(());
    }

    let codes: Vec<String> = entries
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|entry| entry.strip_prefix('E'))
        .map(str::to_string)
        .collect();

    if codes.is_empty() {
        return Err(ExchangeError::UnknownApi);
    }

    Err(ExchangeError::Api {
        codes,
        url: url.to_string(),
        body,
    })
}
