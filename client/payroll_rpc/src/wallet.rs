//! Wallet provider backed by a node's JSON-RPC account methods.
//!
//! | Provider operation   | RPC method                                  |
//! |----------------------|---------------------------------------------|
//! | `accounts`           | `eth_accounts`                              |
//! | `request_accounts`   | `eth_requestAccounts` (falls back to `eth_accounts`) |
//! | `chain_id`           | `eth_chainId`                               |
//! | `sign_message`       | `personal_sign`                             |
//!
//! Nodes do not push `accountsChanged`/`chainChanged`, so [`RpcWallet::subscribe`]
//! polls both values and forwards differences into the controller's inbox.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use payroll_session::{
    Address, ChainId, ProviderError, Signer, Subscription, WalletEvent, WalletProvider,
};
use serde_json::json;
use tokio::sync::mpsc;

use crate::transport::{
    decode_data, encode_data, parse_quantity, JsonRpcClient, RpcError, METHOD_NOT_FOUND_CODE,
};

/// EIP-1193 code for "no account authorized".
const UNAUTHORIZED_CODE: i64 = 4100;

#[derive(Debug, Clone)]
pub struct RpcWallet {
    client: Arc<JsonRpcClient>,
    poll_interval: Duration,
}

impl RpcWallet {
    pub fn new(client: Arc<JsonRpcClient>, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }
}

async fn fetch_accounts(client: &JsonRpcClient) -> Result<Vec<Address>, RpcError> {
    client.call("eth_accounts", json!([])).await
}

async fn fetch_chain_id(client: &JsonRpcClient) -> Result<ChainId, RpcError> {
    let raw: String = client.call("eth_chainId", json!([])).await?;
    parse_quantity(&raw)
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        Ok(fetch_accounts(&self.client).await?)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let requested = self
            .client
            .call::<Vec<Address>>("eth_requestAccounts", json!([]))
            .await;
        match requested {
            Err(RpcError::Rpc { code, .. }) if code == METHOD_NOT_FOUND_CODE => {
                tracing::debug!("eth_requestAccounts unsupported, using eth_accounts");
                Ok(fetch_accounts(&self.client).await?)
            }
            other => Ok(other?),
        }
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        Ok(fetch_chain_id(&self.client).await?)
    }

    async fn signer(&self) -> Result<Arc<dyn Signer>, ProviderError> {
        let accounts = fetch_accounts(&self.client).await?;
        let address = accounts
            .first()
            .copied()
            .ok_or_else(|| ProviderError::new(UNAUTHORIZED_CODE, "no authorized account"))?;
        Ok(Arc::new(RpcSigner {
            client: Arc::clone(&self.client),
            address,
        }))
    }

    fn subscribe(&self, inbox: mpsc::Sender<WalletEvent>) -> Subscription {
        let client = Arc::clone(&self.client);
        let interval = self.poll_interval;
        Subscription::from_task(tokio::spawn(watch(client, interval, inbox)))
    }
}

/// Poll accounts and chain id, forwarding every change. The first poll only
/// records a baseline. Exits once the inbox is closed.
async fn watch(client: Arc<JsonRpcClient>, interval: Duration, inbox: mpsc::Sender<WalletEvent>) {
    let mut last_accounts: Option<Vec<Address>> = None;
    let mut last_chain: Option<ChainId> = None;

    loop {
        match fetch_accounts(&client).await {
            Ok(accounts) => {
                let changed = last_accounts.as_ref().is_some_and(|prev| *prev != accounts);
                if changed {
                    tracing::debug!(count = accounts.len(), "accounts changed");
                    let event = WalletEvent::AccountsChanged(accounts.clone());
                    if inbox.send(event).await.is_err() {
                        return;
                    }
                }
                last_accounts = Some(accounts);
            }
            Err(err) => tracing::warn!(error = %err, "account poll failed"),
        }

        match fetch_chain_id(&client).await {
            Ok(chain_id) => {
                let changed = last_chain.is_some_and(|prev| prev != chain_id);
                if changed {
                    tracing::debug!(chain_id, "chain changed");
                    if inbox.send(WalletEvent::ChainChanged(chain_id)).await.is_err() {
                        return;
                    }
                }
                last_chain = Some(chain_id);
            }
            Err(err) => tracing::warn!(error = %err, "chain poll failed"),
        }

        if inbox.is_closed() {
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Signs with an account unlocked on the node.
#[derive(Debug)]
pub struct RpcSigner {
    client: Arc<JsonRpcClient>,
    address: Address,
}

#[async_trait]
impl Signer for RpcSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let signature: String = self
            .client
            .call("personal_sign", json!([encode_data(message), self.address]))
            .await?;
        Ok(decode_data(&signature)?)
    }
}
