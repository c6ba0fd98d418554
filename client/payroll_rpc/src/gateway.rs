//! HTTP client for the encryption gateway (relayer).
//!
//! | Endpoint             | Request                                  | Response                    |
//! |----------------------|------------------------------------------|-----------------------------|
//! | `GET  /public-key`   |                                          | `{publicKey}`               |
//! | `POST /input-proof`  | `{chainId, publicKey, value}`            | `{ciphertext, proof}`       |
//! | `POST /decrypt`      | `{chainId, handle, message, signature}`  | `{plaintext}`               |
//!
//! Values and plaintexts travel as decimal strings; binary fields are
//! `0x`-prefixed hex.
//!
//! Sessions opened with the placeholder public key (local chains whose
//! gateway is down) encode inputs locally as 32-byte words with an empty
//! proof, the way mock coprocessors on development nodes accept them.
//! Decryption always goes through `POST /decrypt`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use payroll_session::encryption::{
    Authorization, CipherBackend, CipherSession, PublicKeyFetcher, SessionParams,
    PLACEHOLDER_PUBLIC_KEY,
};
use payroll_session::{ChainId, EncryptedInput, GatewayError, Result, SessionError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::transport::{decode_data, encode_data, RpcError};

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputProofRequest<'a> {
    chain_id: ChainId,
    public_key: &'a str,
    value: String,
}

#[derive(Debug, Deserialize)]
struct InputProofResponse {
    ciphertext: String,
    proof: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DecryptRequest<'a> {
    chain_id: ChainId,
    handle: String,
    message: &'a str,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct DecryptResponse {
    plaintext: String,
}

// ── Gateway ───────────────────────────────────────────────────────────────────

/// Public-key fetcher and cipher backend for relayer-style gateways.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(timeout: Duration) -> std::result::Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport {
                url: "gateway".into(),
                reason: e.to_string(),
            })?;
        Ok(Self { http })
    }
}

fn endpoint(gateway_url: &str, path: &str) -> String {
    format!("{}/{path}", gateway_url.trim_end_matches('/'))
}

#[async_trait]
impl PublicKeyFetcher for HttpGateway {
    async fn public_key(&self, gateway_url: &str) -> std::result::Result<String, GatewayError> {
        let url = endpoint(gateway_url, "public-key");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(GatewayError::Unreachable(format!("HTTP {}", resp.status())));
        }
        let body: PublicKeyResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        body.public_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GatewayError::Malformed("response has no publicKey".into()))
    }
}

#[async_trait]
impl CipherBackend for HttpGateway {
    async fn open(&self, params: &SessionParams) -> Result<Arc<dyn CipherSession>> {
        let cleartext_inputs = params.public_key == PLACEHOLDER_PUBLIC_KEY;
        if cleartext_inputs {
            tracing::warn!(chain_id = params.chain_id, "placeholder key, inputs are not encrypted");
        }
        let key = decode_data(&params.public_key)
            .map_err(|e| SessionError::SessionConstructionFailed(format!("public key: {e}")))?;
        if key.is_empty() {
            return Err(SessionError::SessionConstructionFailed(
                "public key is empty".into(),
            ));
        }
        Ok(Arc::new(RelayerSession {
            http: self.http.clone(),
            gateway_url: params.gateway_url.clone(),
            chain_id: params.chain_id,
            public_key: params.public_key.clone(),
            cleartext_inputs,
        }))
    }
}

// ── Sessions ──────────────────────────────────────────────────────────────────

struct RelayerSession {
    http: reqwest::Client,
    gateway_url: String,
    chain_id: ChainId,
    public_key: String,
    cleartext_inputs: bool,
}

impl RelayerSession {
    async fn post<B: Serialize + Sync, R: DeserializeOwned + Send>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<R, String> {
        let url = endpoint(&self.gateway_url, path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("{url}: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("{url}: HTTP {}", resp.status()));
        }
        resp.json().await.map_err(|e| format!("{url}: {e}"))
    }
}

#[async_trait]
impl CipherSession for RelayerSession {
    async fn encrypt_u64(&self, value: u64) -> Result<EncryptedInput> {
        if self.cleartext_inputs {
            return Ok(cleartext_input(value));
        }
        let request = InputProofRequest {
            chain_id: self.chain_id,
            public_key: &self.public_key,
            value: value.to_string(),
        };
        let resp: InputProofResponse = self
            .post("input-proof", &request)
            .await
            .map_err(SessionError::EncryptionFailed)?;
        let decode = |field: &str, text: &str| {
            decode_data(text).map_err(|e| SessionError::EncryptionFailed(format!("{field}: {e}")))
        };
        Ok(EncryptedInput {
            ciphertext: decode("ciphertext", &resp.ciphertext)?,
            proof: decode("proof", &resp.proof)?,
        })
    }

    async fn decrypt(&self, ciphertext: &[u8], authorization: &Authorization) -> Result<u64> {
        let request = DecryptRequest {
            chain_id: self.chain_id,
            handle: encode_data(ciphertext),
            message: &authorization.message,
            signature: encode_data(&authorization.signature),
        };
        let resp: DecryptResponse = self
            .post("decrypt", &request)
            .await
            .map_err(SessionError::DecryptionFailed)?;
        resp.plaintext
            .trim()
            .parse()
            .map_err(|e| SessionError::DecryptionFailed(format!("plaintext: {e}")))
    }
}

/// A value as a 32-byte big-endian word with no proof.
fn cleartext_input(value: u64) -> EncryptedInput {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    EncryptedInput {
        ciphertext: word.to_vec(),
        proof: Vec::new(),
    }
}
