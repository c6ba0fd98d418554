//! Client-side session lifecycle for the confidential payroll contract.
//!
//! The crate coordinates three collaborators behind a single
//! [`SessionController`]:
//!
//! | Component | Module | Responsibility |
//! |-----------|--------|----------------|
//! | Wallet Connector | [`wallet`] | accounts, signer, chain id, change notifications |
//! | Network/Role Resolver | [`role`], [`network`] | employer / employee classification |
//! | Encryption Session Manager | [`encryption`] | one chain-bound encryption handle |
//!
//! Contract access, the wallet, and the encryption gateway are reached only
//! through the traits in [`wallet`], [`contract`] and [`encryption`]; the
//! `payroll_rpc` crate ships JSON-RPC / HTTP implementations of them.

pub mod codec;
pub mod config;
pub mod contract;
pub mod controller;
pub mod encryption;
pub mod error;
pub mod network;
pub mod notify;
pub mod payroll;
pub mod role;
pub mod types;
pub mod wallet;

pub use codec::Amount;
pub use config::{ChainBinding, ClientConfig};
pub use contract::{ContractBinder, PayrollContract};
pub use controller::{ControllerExit, EventOutcome, Session, SessionController};
pub use encryption::{
    Authorization, CipherBackend, CipherSession, EncryptionSession, EncryptionSessionManager,
    PublicKeyFetcher, SessionParams,
};
pub use error::{GatewayError, ProviderError, Result, SessionError};
pub use network::{NetworkInfo, NetworkRegistry};
pub use notify::{Notice, NoticeKind, NoticeLevel, Notifier};
pub use payroll::PayrollClient;
pub use types::{
    Address, ChainId, EmployeeInfo, EncryptedInput, PayrollEvent, PayrollEventKind, Role,
    RoleFlags, TxReceipt, View,
};
pub use wallet::{Signer, Subscription, WalletEvent, WalletProvider};
