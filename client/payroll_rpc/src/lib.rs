//! Network adapters for `payroll_session`.
//!
//! | Module        | Implements                                   | Talks to                 |
//! |---------------|----------------------------------------------|--------------------------|
//! | [`transport`] | JSON-RPC request/response plumbing           | node RPC endpoint        |
//! | [`wallet`]    | `WalletProvider`, `Signer`                   | node account methods     |
//! | [`payroll`]   | `PayrollContract`, `ContractBinder`          | deployed payroll contract|
//! | [`gateway`]   | `PublicKeyFetcher`, `CipherBackend`          | encryption gateway       |

pub mod gateway;
pub mod payroll;
pub mod transport;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use gateway::HttpGateway;
pub use payroll::{Confirmation, RpcContracts, RpcPayroll};
pub use transport::{JsonRpcClient, RpcError};
pub use wallet::{RpcSigner, RpcWallet};
