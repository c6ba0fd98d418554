//! Known networks, their encryption gateways and block explorers.

use serde::{Deserialize, Serialize};

use crate::types::{Address, ChainId};

pub const SEPOLIA_CHAIN_ID: ChainId = 11_155_111;
pub const ZAMA_DEVNET_CHAIN_ID: ChainId = 8009;
pub const LOCALHOST_CHAIN_ID: ChainId = 31_337;

/// Gateway used for chains without an explicit entry.
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.zama.ai";

/// Static description of a supported network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub chain_id: ChainId,
    pub name: String,
    pub rpc_url: String,
    pub gateway_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Development chain: a placeholder public key stands in when its
    /// gateway cannot be reached.
    #[serde(default)]
    pub local: bool,
}

/// Lookup table of supported networks.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    networks: Vec<NetworkInfo>,
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self {
            networks: vec![
                NetworkInfo {
                    chain_id: SEPOLIA_CHAIN_ID,
                    name: "Sepolia (Zama Protocol)".into(),
                    rpc_url: "https://rpc.sepolia.org".into(),
                    gateway_url: DEFAULT_GATEWAY_URL.into(),
                    explorer_url: Some("https://sepolia.etherscan.io".into()),
                    local: false,
                },
                NetworkInfo {
                    chain_id: ZAMA_DEVNET_CHAIN_ID,
                    name: "Zama Devnet".into(),
                    rpc_url: "https://devnet.zama.ai".into(),
                    gateway_url: DEFAULT_GATEWAY_URL.into(),
                    explorer_url: None,
                    local: false,
                },
                NetworkInfo {
                    chain_id: LOCALHOST_CHAIN_ID,
                    name: "Localhost".into(),
                    rpc_url: "http://localhost:8545".into(),
                    gateway_url: "http://localhost:8545".into(),
                    explorer_url: None,
                    local: true,
                },
            ],
        }
    }
}

impl NetworkRegistry {
    /// Built-in networks with `extra` entries added; an extra entry replaces
    /// a built-in one with the same chain id.
    pub fn with_overrides(extra: &[NetworkInfo]) -> Self {
        let mut registry = Self::default();
        for network in extra {
            registry.networks.retain(|n| n.chain_id != network.chain_id);
            registry.networks.push(network.clone());
        }
        registry
    }

    pub fn lookup(&self, chain_id: ChainId) -> Option<&NetworkInfo> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    pub fn is_supported(&self, chain_id: ChainId) -> bool {
        self.lookup(chain_id).is_some()
    }

    pub fn is_local(&self, chain_id: ChainId) -> bool {
        self.lookup(chain_id).is_some_and(|n| n.local)
    }

    pub fn gateway_url(&self, chain_id: ChainId) -> &str {
        self.lookup(chain_id)
            .map(|n| n.gateway_url.as_str())
            .unwrap_or(DEFAULT_GATEWAY_URL)
    }

    pub fn display_name(&self, chain_id: ChainId) -> String {
        match self.lookup(chain_id) {
            Some(n) => n.name.clone(),
            None => format!("Unknown network ({chain_id})"),
        }
    }

    pub fn tx_explorer_url(&self, chain_id: ChainId, tx_hash: &str) -> Option<String> {
        let base = self.lookup(chain_id)?.explorer_url.as_deref()?;
        Some(format!("{base}/tx/{tx_hash}"))
    }

    pub fn address_explorer_url(&self, chain_id: ChainId, address: &Address) -> Option<String> {
        let base = self.lookup(chain_id)?.explorer_url.as_deref()?;
        Some(format!("{base}/address/{address}"))
    }
}
