//! Encryption Session Manager.
//!
//! Holds at most one [`EncryptionSession`], created on demand for a chain id
//! from the public key served by that chain's gateway. The manager is owned
//! by the session controller; `initialize` and `reset` are its only
//! mutators and both take `&mut self`, so they can never interleave.
//!
//! # Chain binding
//! With [`ChainBinding::Sticky`] an existing handle is returned as-is even
//! when the requested chain differs. Callers that switch chains must
//! `reset()` first; the controller does so on every disconnect and rebuilds
//! itself on chain change. [`ChainBinding::Strict`] rebinds instead.

use std::sync::Arc;

use async_trait::async_trait;

use crate::codec::{self, Amount};
use crate::config::ChainBinding;
use crate::error::{GatewayError, Result, SessionError};
use crate::network::NetworkRegistry;
use crate::types::{ChainId, EncryptedInput};
use crate::wallet::{Signer, WalletProvider};

/// Public key used on local development chains when the gateway is down.
pub const PLACEHOLDER_PUBLIC_KEY: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Prefix of every decryption authorization message.
pub const AUTHORIZATION_PREFIX: &str = "Authorize decryption";

// ── Collaborator seams ────────────────────────────────────────────────────────

/// Fetches `GET {gateway}/public-key`.
#[async_trait]
pub trait PublicKeyFetcher: Send + Sync {
    async fn public_key(&self, gateway_url: &str) -> std::result::Result<String, GatewayError>;
}

/// Everything a backend needs to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub chain_id: ChainId,
    pub public_key: String,
    pub gateway_url: String,
}

/// Constructs encryption primitives for a chain.
#[async_trait]
pub trait CipherBackend: Send + Sync {
    /// # Errors
    /// [`SessionError::SessionConstructionFailed`] when `params` cannot back
    /// a session.
    async fn open(&self, params: &SessionParams) -> Result<Arc<dyn CipherSession>>;
}

/// The encrypt / decrypt primitives of one open session.
#[async_trait]
pub trait CipherSession: Send + Sync {
    async fn encrypt_u64(&self, value: u64) -> Result<EncryptedInput>;

    /// Release the plaintext behind `ciphertext`, proving entitlement with
    /// `authorization`.
    async fn decrypt(&self, ciphertext: &[u8], authorization: &Authorization) -> Result<u64>;
}

/// Signed proof that the requester may see a plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub message: String,
    pub signature: Vec<u8>,
}

impl Authorization {
    /// The message an account signs to decrypt `ciphertext` on `chain_id`.
    pub fn message_for(chain_id: ChainId, ciphertext: &[u8]) -> String {
        format!(
            "{AUTHORIZATION_PREFIX}\nchain: {chain_id}\nhandle: 0x{}",
            hex::encode(ciphertext)
        )
    }

    /// Ask `signer` to sign the authorization for `ciphertext`.
    pub async fn request(
        signer: &dyn Signer,
        chain_id: ChainId,
        ciphertext: &[u8],
    ) -> Result<Self> {
        let message = Self::message_for(chain_id, ciphertext);
        let signature = signer.sign_message(message.as_bytes()).await?;
        Ok(Self { message, signature })
    }
}

// ── Session handle ────────────────────────────────────────────────────────────

/// A live encryption session bound to one chain.
pub struct EncryptionSession {
    chain_id: ChainId,
    public_key: String,
    cipher: Arc<dyn CipherSession>,
}

impl std::fmt::Debug for EncryptionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionSession")
            .field("chain_id", &self.chain_id)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl EncryptionSession {
    pub fn new(chain_id: ChainId, public_key: String, cipher: Arc<dyn CipherSession>) -> Self {
        Self {
            chain_id,
            public_key,
            cipher,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub async fn encrypt_u64(&self, value: u64) -> Result<EncryptedInput> {
        self.cipher.encrypt_u64(value).await
    }

    /// Encrypt a decimal amount scaled by `10^decimals`.
    pub async fn encrypt_amount(&self, amount: &str, decimals: u32) -> Result<EncryptedInput> {
        let units = codec::to_units(amount, decimals)?;
        self.encrypt_u64(units).await
    }

    /// Encrypt a percentage scaled by 100.
    pub async fn encrypt_percentage(&self, percentage: &str) -> Result<EncryptedInput> {
        let units = codec::percentage_to_units(percentage)?;
        self.encrypt_u64(units).await
    }

    /// Decrypt `ciphertext` after obtaining `signer`'s authorization.
    pub async fn decrypt_u64(&self, ciphertext: &[u8], signer: &dyn Signer) -> Result<u64> {
        let authorization = Authorization::request(signer, self.chain_id, ciphertext).await?;
        self.cipher.decrypt(ciphertext, &authorization).await
    }

    pub async fn decrypt_amount(
        &self,
        ciphertext: &[u8],
        signer: &dyn Signer,
        decimals: u32,
    ) -> Result<Amount> {
        let units = self.decrypt_u64(ciphertext, signer).await?;
        Ok(Amount::new(units, decimals))
    }

    pub async fn decrypt_percentage(&self, ciphertext: &[u8], signer: &dyn Signer) -> Result<Amount> {
        self.decrypt_amount(ciphertext, signer, codec::PERCENT_DECIMALS)
            .await
    }
}

// ── Manager ───────────────────────────────────────────────────────────────────

pub struct EncryptionSessionManager {
    networks: NetworkRegistry,
    fetcher: Arc<dyn PublicKeyFetcher>,
    backend: Arc<dyn CipherBackend>,
    binding: ChainBinding,
    current: Option<Arc<EncryptionSession>>,
}

impl EncryptionSessionManager {
    pub fn new(
        networks: NetworkRegistry,
        fetcher: Arc<dyn PublicKeyFetcher>,
        backend: Arc<dyn CipherBackend>,
        binding: ChainBinding,
    ) -> Self {
        Self {
            networks,
            fetcher,
            backend,
            binding,
            current: None,
        }
    }

    pub fn current(&self) -> Option<Arc<EncryptionSession>> {
        self.current.clone()
    }

    /// Initialize against the chain `provider` is currently on.
    pub async fn initialize(
        &mut self,
        provider: &dyn WalletProvider,
    ) -> Result<Arc<EncryptionSession>> {
        if let (Some(existing), ChainBinding::Sticky) = (&self.current, self.binding) {
            return Ok(existing.clone());
        }
        let chain_id = provider.chain_id().await?;
        self.initialize_for(chain_id).await
    }

    /// Return the live session, creating one for `chain_id` if none exists.
    ///
    /// # Errors
    /// [`SessionError::GatewayUnreachable`], [`SessionError::PublicKeyUnavailable`]
    /// or [`SessionError::SessionConstructionFailed`]; the manager is left
    /// empty on failure.
    pub async fn initialize_for(&mut self, chain_id: ChainId) -> Result<Arc<EncryptionSession>> {
        if let Some(existing) = &self.current {
            if existing.chain_id() == chain_id {
                return Ok(existing.clone());
            }
            match self.binding {
                ChainBinding::Sticky => {
                    tracing::warn!(
                        bound = existing.chain_id(),
                        requested = chain_id,
                        "reusing encryption session bound to another chain"
                    );
                    return Ok(existing.clone());
                }
                ChainBinding::Strict => {
                    tracing::info!(
                        bound = existing.chain_id(),
                        requested = chain_id,
                        "chain changed, rebinding encryption session"
                    );
                    self.reset();
                }
            }
        }

        let gateway_url = self.networks.gateway_url(chain_id).to_string();
        tracing::info!(chain_id, gateway = %gateway_url, "initializing encryption session");

        let public_key = self.fetch_public_key(chain_id, &gateway_url).await?;
        let params = SessionParams {
            chain_id,
            public_key,
            gateway_url,
        };
        let cipher = self.backend.open(&params).await.map_err(|err| match err {
            SessionError::SessionConstructionFailed(_) => err,
            other => SessionError::SessionConstructionFailed(other.to_string()),
        })?;

        let session = Arc::new(EncryptionSession::new(chain_id, params.public_key, cipher));
        self.current = Some(session.clone());
        tracing::info!(chain_id, "encryption session ready");
        Ok(session)
    }

    /// Drop the live session, if any.
    pub fn reset(&mut self) {
        if let Some(session) = self.current.take() {
            tracing::debug!(chain_id = session.chain_id(), "encryption session released");
        }
    }

    async fn fetch_public_key(&self, chain_id: ChainId, gateway_url: &str) -> Result<String> {
        let outcome = match self.fetcher.public_key(gateway_url).await {
            Ok(key) if key.trim().is_empty() => {
                Err(GatewayError::Malformed("empty publicKey".into()))
            }
            other => other,
        };

        match outcome {
            Ok(key) => Ok(key),
            Err(err) if self.networks.is_local(chain_id) => {
                tracing::warn!(
                    chain_id,
                    error = %err,
                    "gateway fetch failed on local chain, using placeholder public key"
                );
                Ok(PLACEHOLDER_PUBLIC_KEY.to_string())
            }
            Err(GatewayError::Unreachable(reason)) => Err(SessionError::GatewayUnreachable {
                url: gateway_url.to_string(),
                reason,
            }),
            Err(GatewayError::Malformed(reason)) => {
                Err(SessionError::PublicKeyUnavailable { chain_id, reason })
            }
        }
    }
}
