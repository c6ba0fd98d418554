//! Error taxonomy for the session lifecycle and payroll operations.

use thiserror::Error;

use crate::types::ChainId;

pub type Result<T> = std::result::Result<T, SessionError>;

/// EIP-1193 code for a request the user declined in the wallet.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Code wallets return while an identical request still awaits the user.
pub const REQUEST_PENDING_CODE: i64 = -32002;

/// Every failure the client surfaces to its caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no wallet provider is available")]
    ProviderUnavailable,

    #[error("a connection attempt is already in progress")]
    ConnectionInProgress,

    #[error("the request was rejected in the wallet")]
    UserRejected,

    #[error("a wallet request is already pending")]
    RequestAlreadyPending,

    #[error("wallet connection failed: {0}")]
    ConnectionFailed(String),

    #[error("role resolution failed: {0}")]
    RoleResolutionFailed(String),

    #[error("encryption gateway {url} unreachable: {reason}")]
    GatewayUnreachable { url: String, reason: String },

    #[error("public key unavailable for chain {chain_id}: {reason}")]
    PublicKeyUnavailable { chain_id: ChainId, reason: String },

    #[error("encryption session construction failed: {0}")]
    SessionConstructionFailed(String),

    #[error("transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("wallet is not connected")]
    NotConnected,

    #[error("no encryption session is active")]
    EncryptionUnavailable,

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("contract call failed: {0}")]
    Contract(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// True for encryption-session failures, which only degrade the session.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            SessionError::GatewayUnreachable { .. }
                | SessionError::PublicKeyUnavailable { .. }
                | SessionError::SessionConstructionFailed(_)
        )
    }

    /// Short user guidance matching the error kind.
    pub fn guidance(&self) -> &'static str {
        match self {
            SessionError::ProviderUnavailable => "Install or start a wallet provider.",
            SessionError::ConnectionInProgress => "Wait for the current connection to finish.",
            SessionError::UserRejected => "The connection was declined in the wallet.",
            SessionError::RequestAlreadyPending => {
                "A request is already waiting in the wallet. Open it to continue."
            }
            SessionError::ConnectionFailed(_) => "Could not connect to the wallet.",
            SessionError::RoleResolutionFailed(_) => "Could not determine your role.",
            SessionError::GatewayUnreachable { .. } => {
                "Cannot reach the encryption gateway. Check your network connection."
            }
            SessionError::PublicKeyUnavailable { .. } => {
                "Cannot obtain the encryption public key. Check that you are on a supported network."
            }
            SessionError::SessionConstructionFailed(_) => {
                "Encryption could not be initialised. See the logs for details."
            }
            SessionError::TransactionReverted(_) => "The transaction was reverted.",
            SessionError::NotConnected => "Connect a wallet first.",
            SessionError::EncryptionUnavailable => {
                "Encryption is not available. Some features are limited."
            }
            SessionError::InvalidValue(_) => "Check the value and try again.",
            SessionError::EncryptionFailed(_) => "The value could not be encrypted.",
            SessionError::DecryptionFailed(_) => "The value could not be decrypted.",
            SessionError::Contract(_) => "The contract call failed.",
            SessionError::Config(_) => "Fix the configuration file and retry.",
        }
    }
}

/// Error reported by a wallet provider, carrying its numeric code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED_CODE, "User rejected the request.")
    }
}

impl From<ProviderError> for SessionError {
    fn from(err: ProviderError) -> Self {
        match err.code {
            USER_REJECTED_CODE => SessionError::UserRejected,
            REQUEST_PENDING_CODE => SessionError::RequestAlreadyPending,
            _ if err.message.contains("already pending") => SessionError::RequestAlreadyPending,
            _ => SessionError::ConnectionFailed(err.message),
        }
    }
}

/// Failure while fetching the gateway's public encryption parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport failure or non-success HTTP status.
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// The gateway answered but the payload had no usable key.
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}
