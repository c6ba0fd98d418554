//! Network/Role Resolver.

use crate::contract::PayrollContract;
use crate::error::{Result, SessionError};
use crate::types::{Address, RoleFlags};

/// Classify `account` against the payroll contract.
///
/// The employer query is required; the employee lookup is best effort: a
/// failing lookup means "not an employee", not an error.
///
/// # Errors
/// [`SessionError::RoleResolutionFailed`] when the employer query fails.
pub async fn resolve_role(account: Address, contract: &dyn PayrollContract) -> Result<RoleFlags> {
    // Address equality is byte equality, so hex case never matters.
    let employer = contract
        .employer()
        .await
        .map_err(|e| SessionError::RoleResolutionFailed(e.to_string()))?
        == account;

    let employee = match contract.employee_info(account).await {
        Ok(info) => info.is_active,
        Err(err) => {
            tracing::debug!(%account, error = %err, "no employee record");
            false
        }
    };

    tracing::info!(%account, employer, employee, "role resolved");
    Ok(RoleFlags { employer, employee })
}
