//! Wallet Connector: provider seam, change notifications, and the account
//! resolution steps of the connect pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ProviderError, Result, SessionError};
use crate::types::{Address, ChainId};

/// Notification pushed by the wallet into the controller's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
}

/// Signs on behalf of one account on the provider's current chain.
#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;

    /// Personal-message signature over `message`.
    async fn sign_message(&self, message: &[u8]) -> std::result::Result<Vec<u8>, ProviderError>;
}

/// The wallet provider the client is attached to.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts already authorized for this client; never prompts.
    async fn accounts(&self) -> std::result::Result<Vec<Address>, ProviderError>;

    /// Interactive authorization request; may be rejected by the user.
    async fn request_accounts(&self) -> std::result::Result<Vec<Address>, ProviderError>;

    async fn chain_id(&self) -> std::result::Result<ChainId, ProviderError>;

    /// Signer for the primary authorized account.
    async fn signer(&self) -> std::result::Result<Arc<dyn Signer>, ProviderError>;

    /// Start delivering [`WalletEvent`]s into `inbox`. Delivery stops when
    /// the returned [`Subscription`] is dropped.
    fn subscribe(&self, inbox: mpsc::Sender<WalletEvent>) -> Subscription;
}

/// Live event subscription; unsubscribes on drop.
#[derive(Debug, Default)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Subscription backed by a forwarding task.
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// Subscription with nothing to tear down (push-based providers).
    pub fn detached() -> Self {
        Self { task: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Outcome of the wallet-side steps of `connect()`.
pub struct WalletConnection {
    pub account: Address,
    pub chain_id: ChainId,
    pub signer: Arc<dyn Signer>,
}

/// Resolve account, signer and chain id from `provider`.
///
/// `on_prompt` runs right before an interactive authorization request is
/// issued, so callers can tell the user to look at their wallet.
pub async fn establish(
    provider: &dyn WalletProvider,
    on_prompt: impl FnOnce(),
) -> Result<WalletConnection> {
    let authorized = provider.accounts().await?;
    let accounts = if authorized.is_empty() {
        on_prompt();
        tracing::debug!("no authorized accounts, requesting authorization");
        provider.request_accounts().await?
    } else {
        authorized
    };
    if accounts.is_empty() {
        return Err(SessionError::ConnectionFailed(
            "wallet returned no accounts".into(),
        ));
    }

    let signer = provider.signer().await?;
    let account = signer.address();
    let chain_id = provider.chain_id().await?;
    tracing::info!(%account, chain_id, "wallet connected");

    Ok(WalletConnection {
        account,
        chain_id,
        signer,
    })
}
