//! Plain data shared by the session controller and the collaborator traits.

use std::fmt;

pub use alloy_primitives::Address;
use alloy_primitives::B256;

/// EVM network identifier.
pub type ChainId = u64;

// ── Roles ─────────────────────────────────────────────────────────────────────

/// Raw role flags as read from the payroll contract.
///
/// Both flags may be true at once (an employer who also holds an active
/// employee record); [`RoleFlags::role`] resolves the tie in favour of the
/// employer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFlags {
    pub employer: bool,
    pub employee: bool,
}

impl RoleFlags {
    pub fn role(&self) -> Role {
        if self.employer {
            Role::Employer
        } else if self.employee {
            Role::Employee
        } else {
            Role::Neither
        }
    }
}

/// The single role that decides which views are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Employer,
    Employee,
    Neither,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Employer => "employer",
            Role::Employee => "employee",
            Role::Neither => "none",
        };
        f.write_str(name)
    }
}

/// Views a front end may offer for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Connect,
    Home,
    EmployerDashboard,
    EmployeeDashboard,
}

// ── Contract data ─────────────────────────────────────────────────────────────

/// Public part of an employee record, as returned by `getEmployeeInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmployeeInfo {
    pub is_active: bool,
    /// Unix timestamp of the last processed payment, 0 if never paid.
    pub last_payment_date: u64,
    /// Unix timestamp at which the employee was added.
    pub hire_date: u64,
}

/// Ciphertext + proof pair submitted for an encrypted contract argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedInput {
    pub ciphertext: Vec<u8>,
    pub proof: Vec<u8>,
}

/// Confirmed transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
}

/// Payroll contract events surfaced in the activity history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayrollEventKind {
    EmployeeAdded,
    EmployeeRemoved,
    SalaryUpdated,
    PayrollProcessed,
    SalaryPaid,
    FundsDeposited,
    BalanceWithdrawn,
}

impl fmt::Display for PayrollEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayrollEventKind::EmployeeAdded => "EmployeeAdded",
            PayrollEventKind::EmployeeRemoved => "EmployeeRemoved",
            PayrollEventKind::SalaryUpdated => "SalaryUpdated",
            PayrollEventKind::PayrollProcessed => "PayrollProcessed",
            PayrollEventKind::SalaryPaid => "SalaryPaid",
            PayrollEventKind::FundsDeposited => "FundsDeposited",
            PayrollEventKind::BalanceWithdrawn => "BalanceWithdrawn",
        };
        f.write_str(name)
    }
}

/// A decoded payroll log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayrollEvent {
    pub kind: PayrollEventKind,
    /// Indexed address argument (employee or depositor), when the event has one.
    pub subject: Option<Address>,
    pub block_number: u64,
    pub transaction_hash: B256,
}

/// Shorten an address to `0x1234…abcd` for notifications and tables.
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}
