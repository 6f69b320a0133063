use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ShopError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Non-2xx response from the shop API.
    #[error("API error with status {status}: {}", .detail.as_deref().unwrap_or("<no detail>"))]
    Api {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Not logged in; run `login` first")]
    NotAuthenticated,

    #[error("This action requires the admin role")]
    Forbidden,

    #[error("Another request is already in progress")]
    Busy,

    #[error("Out of stock")]
    OutOfStock,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ShopError {
    /// Backend `detail` text, if the API supplied one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ShopError::Api { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ShopError::Api { status, .. } => Some(*status),
            ShopError::Reqwest(e) => e.status(),
            _ => None,
        }
    }

    /// Transport failures and 5xx responses are worth retrying for idempotent reads.
    pub fn is_retryable(&self) -> bool {
        match self {
            ShopError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ShopError::Api { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    /// Build an `Api` error from a failed response, keeping the `detail` field.
    pub async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let detail = match resp.bytes().await {
            Ok(body) => parse_detail(&body),
            Err(_) => None,
        };
        ShopError::Api { status, detail }
    }
}

/// FastAPI-style error body: `{"detail": "..."}` or a list of validation entries.
#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    detail: Value,
}

pub(crate) fn parse_detail(body: &[u8]) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.detail {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Array(items) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
}
