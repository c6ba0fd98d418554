//! Payroll contract seam.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Address, EmployeeInfo, EncryptedInput, PayrollEvent, TxReceipt};
use crate::wallet::Signer;

/// The deployed payroll contract, bound to one signer.
///
/// Writes resolve once the transaction is confirmed and fail with
/// [`crate::SessionError::TransactionReverted`] on revert. Reads fail with
/// [`crate::SessionError::Contract`].
#[async_trait]
pub trait PayrollContract: Send + Sync {
    async fn employer(&self) -> Result<Address>;

    async fn employee_info(&self, employee: Address) -> Result<EmployeeInfo>;

    async fn active_employee_count(&self) -> Result<u64>;

    async fn employee_addresses(&self) -> Result<Vec<Address>>;

    /// Ciphertext handle of `employee`'s withdrawable balance.
    async fn encrypted_balance(&self, employee: Address) -> Result<Vec<u8>>;

    /// Ciphertext handle of `employee`'s net salary.
    async fn encrypted_net_salary(&self, employee: Address) -> Result<Vec<u8>>;

    async fn event_history(&self, from_block: u64) -> Result<Vec<PayrollEvent>>;

    async fn add_employee(
        &self,
        employee: Address,
        gross_salary: &EncryptedInput,
        tax_rate: &EncryptedInput,
    ) -> Result<TxReceipt>;

    async fn update_salary(
        &self,
        employee: Address,
        gross_salary: &EncryptedInput,
        tax_rate: &EncryptedInput,
    ) -> Result<TxReceipt>;

    async fn remove_employee(&self, employee: Address) -> Result<TxReceipt>;

    async fn deposit_funds(&self, amount: &EncryptedInput) -> Result<TxReceipt>;

    async fn process_payroll(&self) -> Result<TxReceipt>;

    async fn withdraw_balance(&self) -> Result<TxReceipt>;
}

/// Builds contract handles bound to a signer.
pub trait ContractBinder: Send + Sync {
    fn payroll(&self, signer: Arc<dyn Signer>) -> Arc<dyn PayrollContract>;
}
