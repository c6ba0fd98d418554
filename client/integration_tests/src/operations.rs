//! Payroll operations on a connected session.

use std::sync::atomic::Ordering;

use payroll_session::encryption::AUTHORIZATION_PREFIX;
use payroll_session::{EncryptedInput, GatewayError, PayrollEventKind, SessionError};

use crate::mocks::{
    Harness, MockFetcher, MockPayroll, MockWallet, Write, ALICE, BOB, EMPLOYER, VALID_KEY,
};

const SEPOLIA: u64 = 11_155_111;

async fn connected_employer() -> Harness {
    let h = Harness::new(
        MockWallet::new(EMPLOYER, SEPOLIA),
        MockPayroll::new(EMPLOYER).with_employee(ALICE),
        MockFetcher::serving(VALID_KEY),
    );
    h.controller.connect().await.unwrap();
    h
}

async fn connected_alice(handle: u64) -> Harness {
    let h = Harness::new(
        MockWallet::new(ALICE, SEPOLIA),
        MockPayroll::new(EMPLOYER)
            .with_employee(ALICE)
            .with_handle(ALICE, handle.to_be_bytes().to_vec()),
        MockFetcher::serving(VALID_KEY),
    );
    h.controller.connect().await.unwrap();
    h
}

#[tokio::test]
async fn add_employee_encrypts_scaled_amounts() {
    let h = connected_employer().await;
    let payroll = h.controller.payroll().await.unwrap();

    let receipt = payroll.add_employee(BOB, "5000.00", "25").await.unwrap();

    assert_eq!(receipt.block_number, Some(1));
    assert_eq!(h.backend.encrypted(), vec![5_000_000_000, 2_500]);
    assert_eq!(
        h.payroll.writes(),
        vec![Write::AddEmployee(
            BOB,
            EncryptedInput {
                ciphertext: 5_000_000_000u64.to_be_bytes().to_vec(),
                proof: vec![0xaa],
            },
            EncryptedInput {
                ciphertext: 2_500u64.to_be_bytes().to_vec(),
                proof: vec![0xaa],
            },
        )]
    );
}

#[tokio::test]
async fn invalid_values_never_reach_the_contract() {
    let h = connected_employer().await;
    let payroll = h.controller.payroll().await.unwrap();

    for (salary, rate) in [("0", "10"), ("1000000.01", "10"), ("abc", "10"), ("5000", "101")] {
        let err = payroll.add_employee(BOB, salary, rate).await.unwrap_err();
        assert!(
            matches!(err, SessionError::InvalidValue(_)),
            "{salary}/{rate}: {err:?}"
        );
    }
    assert!(matches!(
        payroll.deposit_funds("0").await,
        Err(SessionError::InvalidValue(_))
    ));
    assert!(h.backend.encrypted().is_empty());
    assert!(h.payroll.writes().is_empty());
}

#[tokio::test]
async fn employer_lifecycle_is_recorded_in_history() {
    let h = connected_employer().await;
    let payroll = h.controller.payroll().await.unwrap();

    payroll.deposit_funds("10000").await.unwrap();
    payroll.update_salary(ALICE, "6000", "20").await.unwrap();
    payroll.process_payroll().await.unwrap();
    payroll.remove_employee(ALICE).await.unwrap();

    let kinds: Vec<_> = payroll
        .history(0)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            PayrollEventKind::FundsDeposited,
            PayrollEventKind::SalaryUpdated,
            PayrollEventKind::PayrollProcessed,
            PayrollEventKind::EmployeeRemoved,
        ]
    );
    assert_eq!(payroll.history(3).await.unwrap().len(), 2);
}

#[tokio::test]
async fn roster_lists_employee_records() {
    let h = connected_employer().await;
    let payroll = h.controller.payroll().await.unwrap();

    let roster = payroll.roster().await.unwrap();

    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].0, ALICE);
    assert!(roster[0].1.is_active);
    assert_eq!(payroll.active_employee_count().await.unwrap(), 1);
}

#[tokio::test]
async fn reverted_write_surfaces_as_transaction_reverted() {
    let h = connected_employer().await;
    h.payroll.revert_writes.store(true, Ordering::SeqCst);
    let payroll = h.controller.payroll().await.unwrap();

    assert!(matches!(
        payroll.process_payroll().await,
        Err(SessionError::TransactionReverted(_))
    ));
}

#[tokio::test]
async fn net_salary_is_decrypted_after_authorization() {
    let h = connected_alice(3_750_000_000).await;
    let payroll = h.controller.payroll().await.unwrap();

    let net = payroll.decrypt_net_salary().await.unwrap();

    assert_eq!(net.units(), 3_750_000_000);
    assert_eq!(net.to_string(), "3750.00");
    let signed = h.wallet.signed.lock().unwrap().clone();
    assert_eq!(signed.len(), 1);
    assert!(signed[0].starts_with(AUTHORIZATION_PREFIX));
    assert!(signed[0].contains(&format!("chain: {SEPOLIA}")));
}

#[tokio::test]
async fn employee_withdraws_and_reads_own_record() {
    let h = connected_alice(1_250_500_000).await;
    let payroll = h.controller.payroll().await.unwrap();

    assert_eq!(payroll.account(), ALICE);
    assert_eq!(payroll.decrypt_balance().await.unwrap().to_string(), "1250.50");
    assert!(payroll.employee_info(ALICE).await.unwrap().is_active);
    payroll.withdraw_balance().await.unwrap();
    assert_eq!(h.payroll.writes(), vec![Write::Withdraw]);
    let history = payroll.history(0).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, PayrollEventKind::BalanceWithdrawn);
}

#[tokio::test]
async fn degraded_session_blocks_only_encrypted_operations() {
    let h = Harness::new(
        MockWallet::new(EMPLOYER, SEPOLIA),
        MockPayroll::new(EMPLOYER).with_employee(ALICE),
        MockFetcher::failing(GatewayError::Unreachable("HTTP 500".into())),
    );
    h.controller.connect().await.unwrap();
    let payroll = h.controller.payroll().await.unwrap();

    assert_eq!(
        payroll.add_employee(BOB, "5000", "25").await.unwrap_err(),
        SessionError::EncryptionUnavailable
    );
    assert_eq!(
        payroll.decrypt_balance().await.unwrap_err(),
        SessionError::EncryptionUnavailable
    );
    assert_eq!(payroll.roster().await.unwrap().len(), 1);
    payroll.process_payroll().await.unwrap();
}
