//! Minimal Ethereum JSON-RPC client over HTTP.
//!
//! Every request is a single `{"jsonrpc":"2.0", ...}` POST. A response with
//! an `error` object becomes [`RpcError::Rpc`] carrying the node's code, so
//! wallet codes such as `4001` survive all the way to the session layer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use payroll_session::{ProviderError, SessionError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Code used when the node was never reached.
pub const TRANSPORT_ERROR_CODE: i64 = -32603;

/// Code nodes return for an unknown method.
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// Code geth returns for `execution reverted`.
const EXECUTION_REVERTED_CODE: i64 = 3;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("cannot reach {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed rpc response: {0}")]
    Decode(String),
}

impl RpcError {
    /// True when the node reported a reverted execution.
    pub fn is_revert(&self) -> bool {
        match self {
            RpcError::Rpc { code, message } => {
                *code == EXECUTION_REVERTED_CODE || message.to_lowercase().contains("revert")
            }
            _ => false,
        }
    }
}

impl From<RpcError> for ProviderError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Rpc { code, message } => ProviderError::new(code, message),
            other => ProviderError::new(TRANSPORT_ERROR_CODE, other.to_string()),
        }
    }
}

impl From<RpcError> for SessionError {
    fn from(err: RpcError) -> Self {
        if err.is_revert() {
            SessionError::TransactionReverted(err.to_string())
        } else {
            SessionError::Contract(err.to_string())
        }
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

// ── Client ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let url = url.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    /// Call `method` and deserialize its `result`. A missing result is
    /// deserialized from `null`, so `Option<T>` targets see `None`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(method, id, "rpc request");

        let transport = |e: reqwest::Error| RpcError::Transport {
            url: self.url.clone(),
            reason: e.to_string(),
        };
        let resp: RpcResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .json()
            .await
            .map_err(|e| RpcError::Decode(e.to_string()))?;

        if let Some(err) = resp.error {
            tracing::debug!(method, code = err.code, message = %err.message, "rpc error");
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        serde_json::from_value(resp.result.unwrap_or(Value::Null))
            .map_err(|e| RpcError::Decode(format!("{method}: {e}")))
    }
}

// ── Hex helpers ───────────────────────────────────────────────────────────────

/// Parse a `0x`-prefixed hex quantity such as `"0x7a69"`.
pub fn parse_quantity(text: &str) -> Result<u64, RpcError> {
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::Decode(format!("quantity without 0x prefix: {text}")))?;
    if digits.is_empty() {
        return Err(RpcError::Decode("empty quantity".into()));
    }
    u64::from_str_radix(digits, 16).map_err(|e| RpcError::Decode(format!("{text}: {e}")))
}

pub fn quantity(value: u64) -> String {
    format!("{value:#x}")
}

/// Decode `0x`-prefixed hex data; `"0x"` is the empty byte string.
pub fn decode_data(text: &str) -> Result<Vec<u8>, RpcError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| RpcError::Decode(format!("invalid hex data: {e}")))
}

pub fn encode_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
