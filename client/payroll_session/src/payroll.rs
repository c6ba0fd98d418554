//! Employer and employee operations on top of a connected session.

use std::sync::Arc;

use crate::codec::{self, Amount, PERCENT_DECIMALS};
use crate::contract::PayrollContract;
use crate::encryption::EncryptionSession;
use crate::error::{Result, SessionError};
use crate::types::{Address, EmployeeInfo, PayrollEvent, TxReceipt};
use crate::wallet::Signer;

/// Upper bound for a gross salary, in whole token units.
pub const MAX_SALARY: u64 = 1_000_000;

/// Upper bound for a tax rate, in percent.
pub const MAX_TAX_RATE: u64 = 100;

/// Payroll operations for one connected account.
///
/// Operations that submit or reveal amounts need the session's encryption
/// handle and fail with [`SessionError::EncryptionUnavailable`] without it;
/// the rest work in degraded mode.
pub struct PayrollClient {
    contract: Arc<dyn PayrollContract>,
    signer: Arc<dyn Signer>,
    encryption: Option<Arc<EncryptionSession>>,
    decimals: u32,
}

impl PayrollClient {
    pub fn new(
        contract: Arc<dyn PayrollContract>,
        signer: Arc<dyn Signer>,
        encryption: Option<Arc<EncryptionSession>>,
        decimals: u32,
    ) -> Self {
        Self {
            contract,
            signer,
            encryption,
            decimals,
        }
    }

    pub fn account(&self) -> Address {
        self.signer.address()
    }

    fn session(&self) -> Result<&EncryptionSession> {
        self.encryption
            .as_deref()
            .ok_or(SessionError::EncryptionUnavailable)
    }

    // ── Employer ──────────────────────────────────────────────────────────────

    pub async fn add_employee(
        &self,
        employee: Address,
        gross_salary: &str,
        tax_rate: &str,
    ) -> Result<TxReceipt> {
        validate_salary(gross_salary, self.decimals)?;
        validate_tax_rate(tax_rate)?;
        let session = self.session()?;
        let gross = session.encrypt_amount(gross_salary, self.decimals).await?;
        let rate = session.encrypt_percentage(tax_rate).await?;
        let receipt = self.contract.add_employee(employee, &gross, &rate).await?;
        tracing::info!(%employee, tx = %receipt.transaction_hash, "employee added");
        Ok(receipt)
    }

    pub async fn update_salary(
        &self,
        employee: Address,
        gross_salary: &str,
        tax_rate: &str,
    ) -> Result<TxReceipt> {
        validate_salary(gross_salary, self.decimals)?;
        validate_tax_rate(tax_rate)?;
        let session = self.session()?;
        let gross = session.encrypt_amount(gross_salary, self.decimals).await?;
        let rate = session.encrypt_percentage(tax_rate).await?;
        let receipt = self.contract.update_salary(employee, &gross, &rate).await?;
        tracing::info!(%employee, tx = %receipt.transaction_hash, "salary updated");
        Ok(receipt)
    }

    pub async fn remove_employee(&self, employee: Address) -> Result<TxReceipt> {
        let receipt = self.contract.remove_employee(employee).await?;
        tracing::info!(%employee, tx = %receipt.transaction_hash, "employee removed");
        Ok(receipt)
    }

    pub async fn deposit_funds(&self, amount: &str) -> Result<TxReceipt> {
        if codec::to_units(amount, self.decimals)? == 0 {
            return Err(SessionError::InvalidValue("deposit must be positive".into()));
        }
        let encrypted = self.session()?.encrypt_amount(amount, self.decimals).await?;
        let receipt = self.contract.deposit_funds(&encrypted).await?;
        tracing::info!(tx = %receipt.transaction_hash, "funds deposited");
        Ok(receipt)
    }

    pub async fn process_payroll(&self) -> Result<TxReceipt> {
        let receipt = self.contract.process_payroll().await?;
        tracing::info!(tx = %receipt.transaction_hash, "payroll processed");
        Ok(receipt)
    }

    /// Every registered employee with their record, in contract order.
    pub async fn roster(&self) -> Result<Vec<(Address, EmployeeInfo)>> {
        let addresses = self.contract.employee_addresses().await?;
        let mut roster = Vec::with_capacity(addresses.len());
        for address in addresses {
            let info = self.contract.employee_info(address).await?;
            roster.push((address, info));
        }
        Ok(roster)
    }

    pub async fn active_employee_count(&self) -> Result<u64> {
        self.contract.active_employee_count().await
    }

    pub async fn history(&self, from_block: u64) -> Result<Vec<PayrollEvent>> {
        self.contract.event_history(from_block).await
    }

    // ── Employee ──────────────────────────────────────────────────────────────

    pub async fn employee_info(&self, employee: Address) -> Result<EmployeeInfo> {
        self.contract.employee_info(employee).await
    }

    pub async fn withdraw_balance(&self) -> Result<TxReceipt> {
        let receipt = self.contract.withdraw_balance().await?;
        tracing::info!(tx = %receipt.transaction_hash, "balance withdrawn");
        Ok(receipt)
    }

    /// Decrypt the connected account's balance; asks the signer to authorize.
    pub async fn decrypt_balance(&self) -> Result<Amount> {
        let session = self.session()?;
        let ciphertext = self.contract.encrypted_balance(self.account()).await?;
        session
            .decrypt_amount(&ciphertext, self.signer.as_ref(), self.decimals)
            .await
    }

    /// Decrypt the connected account's net salary; asks the signer to authorize.
    pub async fn decrypt_net_salary(&self) -> Result<Amount> {
        let session = self.session()?;
        let ciphertext = self.contract.encrypted_net_salary(self.account()).await?;
        session
            .decrypt_amount(&ciphertext, self.signer.as_ref(), self.decimals)
            .await
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

/// A gross salary must be positive and at most [`MAX_SALARY`].
pub fn validate_salary(gross_salary: &str, decimals: u32) -> Result<u64> {
    let units = codec::to_units(gross_salary, decimals)?;
    let max = MAX_SALARY.saturating_mul(10u64.pow(decimals));
    if units == 0 || units > max {
        return Err(SessionError::InvalidValue(format!(
            "salary must be greater than 0 and at most {MAX_SALARY}"
        )));
    }
    Ok(units)
}

/// A tax rate must lie in `0..=100` percent.
pub fn validate_tax_rate(tax_rate: &str) -> Result<u64> {
    let units = codec::percentage_to_units(tax_rate)?;
    if units > MAX_TAX_RATE * 10u64.pow(PERCENT_DECIMALS) {
        return Err(SessionError::InvalidValue(format!(
            "tax rate must be between 0 and {MAX_TAX_RATE}"
        )));
    }
    Ok(units)
}

/// Gross salary minus tax, computed in token units.
pub fn net_salary(gross_salary: &str, tax_rate: &str, decimals: u32) -> Result<Amount> {
    let gross = validate_salary(gross_salary, decimals)? as u128;
    let rate = validate_tax_rate(tax_rate)? as u128;
    let scale = 100 * 10u128.pow(PERCENT_DECIMALS);
    let tax = gross * rate / scale;
    Ok(Amount::new((gross - tax) as u64, decimals))
}
