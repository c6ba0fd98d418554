//! Client configuration, stored as TOML at `~/.fhe-payroll/config.toml`.
//!
//! Every field has a default, so a missing file or a partial file is valid.
//!
//! ```toml
//! rpc_url = "http://localhost:8545"
//! payroll_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
//! decimals = 6
//! chain_binding = "sticky"
//!
//! [[networks]]
//! chain_id = 11155111
//! name = "Sepolia (private gateway)"
//! rpc_url = "https://rpc.sepolia.org"
//! gateway_url = "https://gateway.internal"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::{DEFAULT_DECIMALS, MAX_DECIMALS};
use crate::error::{Result, SessionError};
use crate::network::{NetworkInfo, NetworkRegistry};
use crate::types::Address;

pub const CONFIG_DIR: &str = ".fhe-payroll";
pub const CONFIG_FILE: &str = "config.toml";

const DEFAULT_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_PAYROLL_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// What `initialize` does when a handle exists for a different chain.
///
/// The controller releases the handle on every disconnect and chain change,
/// so the binding only decides the outcome when `connect` runs again on a
/// live session whose wallet moved to another chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainBinding {
    /// Return the existing handle regardless of chain.
    #[default]
    Sticky,
    /// Drop the existing handle and bind a new one to the current chain.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub rpc_url: String,
    pub payroll_address: String,
    pub decimals: u32,
    /// Settle time before reconnecting after an account switch.
    pub reconnect_delay_ms: u64,
    /// How often the RPC wallet polls for account / chain changes.
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    /// Receipt polls before a submitted transaction counts as unconfirmed.
    pub confirmation_attempts: u32,
    pub confirmation_interval_ms: u64,
    pub chain_binding: ChainBinding,
    pub networks: Vec<NetworkInfo>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            payroll_address: DEFAULT_PAYROLL_ADDRESS.into(),
            decimals: DEFAULT_DECIMALS,
            reconnect_delay_ms: 500,
            poll_interval_ms: 2_000,
            request_timeout_secs: 30,
            confirmation_attempts: 120,
            confirmation_interval_ms: 500,
            chain_binding: ChainBinding::Sticky,
            networks: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Returns `~/.fhe-payroll/config.toml`.
    ///
    /// # Errors
    /// Returns an error when the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            SessionError::Config(
                "cannot determine the home directory; set HOME (Unix) or USERPROFILE (Windows)"
                    .into(),
            )
        })?;
        Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Parse the file at `path`, or defaults if it does not exist.
    ///
    /// The result is not validated; callers apply their overrides first and
    /// then call [`ClientConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file absent, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            SessionError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&text)
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))
    }

    /// Write this configuration to `path`, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                SessionError::Config(format!("cannot create {}: {e}", dir.display()))
            })?;
        }
        let text = toml::to_string_pretty(self)
            .map_err(|e| SessionError::Config(format!("cannot serialise config: {e}")))?;
        std::fs::write(path, text)
            .map_err(|e| SessionError::Config(format!("cannot write {}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        if self.decimals > MAX_DECIMALS {
            return Err(SessionError::Config(format!(
                "decimals must be at most {MAX_DECIMALS}, got {}",
                self.decimals
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(SessionError::Config("poll_interval_ms must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(SessionError::Config(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.confirmation_attempts == 0 || self.confirmation_interval_ms == 0 {
            return Err(SessionError::Config(
                "confirmation_attempts and confirmation_interval_ms must be positive".into(),
            ));
        }
        self.payroll()?;
        Ok(())
    }

    pub fn payroll(&self) -> Result<Address> {
        parse_address("payroll_address", &self.payroll_address)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn confirmation_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_interval_ms)
    }

    pub fn registry(&self) -> NetworkRegistry {
        NetworkRegistry::with_overrides(&self.networks)
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address> {
    value
        .parse::<Address>()
        .map_err(|e| SessionError::Config(format!("{field} '{value}' is not an address: {e}")))
}
