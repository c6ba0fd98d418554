//! Payroll contract over `eth_call` / `eth_sendTransaction`.
//!
//! # Event layout
//!
//! ```text
//! EmployeeAdded(address indexed employee, uint256 hireDate)
//! EmployeeRemoved(address indexed employee)
//! SalaryUpdated(address indexed employee)
//! PayrollProcessed(uint256 timestamp, uint256 employeeCount)
//! SalaryPaid(address indexed employee, uint256 timestamp)
//! FundsDeposited(address indexed from, uint256 timestamp)
//! BalanceWithdrawn(address indexed employee, uint256 timestamp)
//! ```
//!
//! `topics[0]` selects the kind; `topics[1]`, when present, is the subject
//! address left-padded to 32 bytes.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use async_trait::async_trait;
use payroll_session::{
    Address, ContractBinder, EmployeeInfo, EncryptedInput, PayrollContract, PayrollEvent,
    PayrollEventKind, Result, SessionError, Signer, TxReceipt,
};
use serde::Deserialize;
use serde_json::json;

use crate::transport::{decode_data, encode_data, parse_quantity, quantity, JsonRpcClient};

sol! {
    interface IZKPayroll {
        function employer() external view returns (address);
        function addEmployee(address employee, bytes encryptedGrossSalary, bytes grossSalaryProof, bytes encryptedTaxRate, bytes taxRateProof) external;
        function updateSalary(address employee, bytes encryptedGrossSalary, bytes grossSalaryProof, bytes encryptedTaxRate, bytes taxRateProof) external;
        function removeEmployee(address employee) external;
        function depositFunds(bytes encryptedAmount, bytes amountProof) external;
        function processPayroll() external;
        function withdrawBalance() external;
        function getEmployeeInfo(address employee) external view returns (bool isActive, uint256 lastPaymentDate, uint256 hireDate);
        function getActiveEmployeeCount() external view returns (uint256);
        function getEmployeeAddresses() external view returns (address[]);
        function getEncryptedBalance(address employee) external view returns (bytes32);
        function getEncryptedNetSalary(address employee) external view returns (bytes32);

        event EmployeeAdded(address indexed employee, uint256 hireDate);
        event EmployeeRemoved(address indexed employee);
        event SalaryUpdated(address indexed employee);
        event PayrollProcessed(uint256 timestamp, uint256 employeeCount);
        event SalaryPaid(address indexed employee, uint256 timestamp);
        event FundsDeposited(address indexed from, uint256 timestamp);
        event BalanceWithdrawn(address indexed employee, uint256 timestamp);
    }
}

/// How long a write waits for its receipt.
#[derive(Debug, Clone, Copy)]
pub struct Confirmation {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for Confirmation {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            attempts: 120,
        }
    }
}

// ── JSON-RPC response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: Option<String>,
    block_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    topics: Vec<B256>,
    block_number: Option<String>,
    transaction_hash: Option<B256>,
    #[serde(default)]
    removed: bool,
}

// ── Binder ────────────────────────────────────────────────────────────────────

/// Binds [`RpcPayroll`] handles for the configured deployment.
#[derive(Debug, Clone)]
pub struct RpcContracts {
    client: Arc<JsonRpcClient>,
    payroll: Address,
    confirmation: Confirmation,
}

impl RpcContracts {
    pub fn new(client: Arc<JsonRpcClient>, payroll: Address) -> Self {
        Self {
            client,
            payroll,
            confirmation: Confirmation::default(),
        }
    }

    pub fn with_confirmation(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = confirmation;
        self
    }
}

impl ContractBinder for RpcContracts {
    fn payroll(&self, signer: Arc<dyn Signer>) -> Arc<dyn PayrollContract> {
        Arc::new(RpcPayroll {
            client: Arc::clone(&self.client),
            address: self.payroll,
            from: signer.address(),
            confirmation: self.confirmation,
        })
    }
}

// ── Contract handle ───────────────────────────────────────────────────────────

pub struct RpcPayroll {
    client: Arc<JsonRpcClient>,
    address: Address,
    from: Address,
    confirmation: Confirmation,
}

impl RpcPayroll {
    async fn read<C: SolCall + Send + Sync>(&self, call: C) -> Result<C::Return> {
        let request = json!({
            "from": self.from,
            "to": self.address,
            "data": encode_data(&call.abi_encode()),
        });
        let out: String = self.client.call("eth_call", json!([request, "latest"])).await?;
        let bytes = decode_data(&out)?;
        C::abi_decode_returns(&bytes, true)
            .map_err(|e| SessionError::Contract(format!("{}: {e}", C::SIGNATURE)))
    }

    async fn write<C: SolCall + Send + Sync>(&self, call: C) -> Result<TxReceipt> {
        let request = json!({
            "from": self.from,
            "to": self.address,
            "data": encode_data(&call.abi_encode()),
        });
        let hash: B256 = self
            .client
            .call("eth_sendTransaction", json!([request]))
            .await?;
        tracing::debug!(call = C::SIGNATURE, tx = %hash, "transaction submitted");
        self.confirm(hash).await
    }

    async fn confirm(&self, hash: B256) -> Result<TxReceipt> {
        for _ in 0..self.confirmation.attempts {
            let receipt: Option<RawReceipt> = self
                .client
                .call("eth_getTransactionReceipt", json!([hash]))
                .await?;
            if let Some(receipt) = receipt {
                return receipt_outcome(hash, receipt);
            }
            tokio::time::sleep(self.confirmation.interval).await;
        }
        Err(SessionError::Contract(format!(
            "transaction {hash} not confirmed after {} polls",
            self.confirmation.attempts
        )))
    }
}

fn receipt_outcome(hash: B256, receipt: RawReceipt) -> Result<TxReceipt> {
    if receipt.status.as_deref() == Some("0x0") {
        return Err(SessionError::TransactionReverted(format!(
            "transaction {hash} reverted"
        )));
    }
    let block_number = receipt
        .block_number
        .as_deref()
        .map(parse_quantity)
        .transpose()?;
    Ok(TxReceipt {
        transaction_hash: hash,
        block_number,
    })
}

fn to_u64(value: U256, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| SessionError::Contract(format!("{field} out of range")))
}

fn bytes(data: &[u8]) -> Bytes {
    Bytes::copy_from_slice(data)
}

/// Map a raw log to a payroll event; unknown topics and removed logs yield `None`.
fn decode_log(log: RawLog) -> Result<Option<PayrollEvent>> {
    if log.removed {
        return Ok(None);
    }
    let Some(topic0) = log.topics.first() else {
        return Ok(None);
    };
    let kind = match *topic0 {
        t if t == IZKPayroll::EmployeeAdded::SIGNATURE_HASH => PayrollEventKind::EmployeeAdded,
        t if t == IZKPayroll::EmployeeRemoved::SIGNATURE_HASH => PayrollEventKind::EmployeeRemoved,
        t if t == IZKPayroll::SalaryUpdated::SIGNATURE_HASH => PayrollEventKind::SalaryUpdated,
        t if t == IZKPayroll::PayrollProcessed::SIGNATURE_HASH => {
            PayrollEventKind::PayrollProcessed
        }
        t if t == IZKPayroll::SalaryPaid::SIGNATURE_HASH => PayrollEventKind::SalaryPaid,
        t if t == IZKPayroll::FundsDeposited::SIGNATURE_HASH => PayrollEventKind::FundsDeposited,
        t if t == IZKPayroll::BalanceWithdrawn::SIGNATURE_HASH => {
            PayrollEventKind::BalanceWithdrawn
        }
        _ => return Ok(None),
    };
    let block_number = match log.block_number.as_deref() {
        Some(raw) => parse_quantity(raw)?,
        // Pending logs have no block yet.
        None => return Ok(None),
    };
    Ok(Some(PayrollEvent {
        kind,
        subject: log.topics.get(1).map(|word| Address::from_word(*word)),
        block_number,
        transaction_hash: log.transaction_hash.unwrap_or_default(),
    }))
}

#[async_trait]
impl PayrollContract for RpcPayroll {
    async fn employer(&self) -> Result<Address> {
        Ok(self.read(IZKPayroll::employerCall {}).await?._0)
    }

    async fn employee_info(&self, employee: Address) -> Result<EmployeeInfo> {
        let info = self
            .read(IZKPayroll::getEmployeeInfoCall { employee })
            .await?;
        Ok(EmployeeInfo {
            is_active: info.isActive,
            last_payment_date: to_u64(info.lastPaymentDate, "lastPaymentDate")?,
            hire_date: to_u64(info.hireDate, "hireDate")?,
        })
    }

    async fn active_employee_count(&self) -> Result<u64> {
        let count = self.read(IZKPayroll::getActiveEmployeeCountCall {}).await?;
        to_u64(count._0, "activeEmployeeCount")
    }

    async fn employee_addresses(&self) -> Result<Vec<Address>> {
        Ok(self.read(IZKPayroll::getEmployeeAddressesCall {}).await?._0)
    }

    async fn encrypted_balance(&self, employee: Address) -> Result<Vec<u8>> {
        let handle = self
            .read(IZKPayroll::getEncryptedBalanceCall { employee })
            .await?;
        Ok(handle._0.to_vec())
    }

    async fn encrypted_net_salary(&self, employee: Address) -> Result<Vec<u8>> {
        let handle = self
            .read(IZKPayroll::getEncryptedNetSalaryCall { employee })
            .await?;
        Ok(handle._0.to_vec())
    }

    async fn event_history(&self, from_block: u64) -> Result<Vec<PayrollEvent>> {
        let filter = json!({
            "address": self.address,
            "fromBlock": quantity(from_block),
            "toBlock": "latest",
        });
        let logs: Vec<RawLog> = self.client.call("eth_getLogs", json!([filter])).await?;
        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            if let Some(event) = decode_log(log)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    async fn add_employee(
        &self,
        employee: Address,
        gross_salary: &EncryptedInput,
        tax_rate: &EncryptedInput,
    ) -> Result<TxReceipt> {
        self.write(IZKPayroll::addEmployeeCall {
            employee,
            encryptedGrossSalary: bytes(&gross_salary.ciphertext),
            grossSalaryProof: bytes(&gross_salary.proof),
            encryptedTaxRate: bytes(&tax_rate.ciphertext),
            taxRateProof: bytes(&tax_rate.proof),
        })
        .await
    }

    async fn update_salary(
        &self,
        employee: Address,
        gross_salary: &EncryptedInput,
        tax_rate: &EncryptedInput,
    ) -> Result<TxReceipt> {
        self.write(IZKPayroll::updateSalaryCall {
            employee,
            encryptedGrossSalary: bytes(&gross_salary.ciphertext),
            grossSalaryProof: bytes(&gross_salary.proof),
            encryptedTaxRate: bytes(&tax_rate.ciphertext),
            taxRateProof: bytes(&tax_rate.proof),
        })
        .await
    }

    async fn remove_employee(&self, employee: Address) -> Result<TxReceipt> {
        self.write(IZKPayroll::removeEmployeeCall { employee }).await
    }

    async fn deposit_funds(&self, amount: &EncryptedInput) -> Result<TxReceipt> {
        self.write(IZKPayroll::depositFundsCall {
            encryptedAmount: bytes(&amount.ciphertext),
            amountProof: bytes(&amount.proof),
        })
        .await
    }

    async fn process_payroll(&self) -> Result<TxReceipt> {
        self.write(IZKPayroll::processPayrollCall {}).await
    }

    async fn withdraw_balance(&self) -> Result<TxReceipt> {
        self.write(IZKPayroll::withdrawBalanceCall {}).await
    }
}
