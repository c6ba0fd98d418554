//! In-memory collaborators for driving `SessionController` end to end.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::B256;
use async_trait::async_trait;
use payroll_session::encryption::{
    Authorization, CipherBackend, CipherSession, PublicKeyFetcher, SessionParams,
};
use payroll_session::notify::RecordingNotifier;
use payroll_session::{
    Address, ChainBinding, ChainId, ContractBinder, EmployeeInfo, EncryptedInput,
    EncryptionSessionManager, GatewayError, NetworkRegistry, PayrollContract, PayrollEvent,
    PayrollEventKind, ProviderError, Result, SessionController, SessionError, Signer,
    Subscription, TxReceipt, WalletEvent, WalletProvider,
};
use tokio::sync::{mpsc, Notify};

pub const EMPLOYER: Address = Address::new([0xe1; 20]);
pub const ALICE: Address = Address::new([0xa1; 20]);
pub const BOB: Address = Address::new([0xb0; 20]);

pub const VALID_KEY: &str = "0x0102030405060708";

// ── Wallet ────────────────────────────────────────────────────────────────────

pub struct MockWallet {
    /// What `eth_accounts` reports.
    authorized: Mutex<Vec<Address>>,
    /// What the user approves when prompted.
    approvable: Mutex<Vec<Address>>,
    rejection: Mutex<Option<ProviderError>>,
    chain_id: AtomicU64,
    /// Holds `request_accounts` until notified.
    gate: Option<Arc<Notify>>,
    pub prompts: AtomicUsize,
    pub signed: Arc<Mutex<Vec<String>>>,
}

impl MockWallet {
    /// A wallet with nothing authorized yet that approves `account`.
    pub fn new(account: Address, chain_id: ChainId) -> Self {
        Self {
            authorized: Mutex::new(Vec::new()),
            approvable: Mutex::new(vec![account]),
            rejection: Mutex::new(None),
            chain_id: AtomicU64::new(chain_id),
            gate: None,
            prompts: AtomicUsize::new(0),
            signed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn authorized(self) -> Self {
        let approvable = self.approvable.lock().unwrap().clone();
        *self.authorized.lock().unwrap() = approvable;
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn rejecting(self, error: ProviderError) -> Self {
        *self.rejection.lock().unwrap() = Some(error);
        self
    }

    /// Simulate the user switching to `account` inside the wallet.
    pub fn switch_account(&self, account: Address) {
        *self.authorized.lock().unwrap() = vec![account];
        *self.approvable.lock().unwrap() = vec![account];
    }

    pub fn switch_chain(&self, chain_id: ChainId) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
        Ok(self.authorized.lock().unwrap().clone())
    }

    async fn request_accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(err) = self.rejection.lock().unwrap().clone() {
            return Err(err);
        }
        let approved = self.approvable.lock().unwrap().clone();
        *self.authorized.lock().unwrap() = approved.clone();
        Ok(approved)
    }

    async fn chain_id(&self) -> std::result::Result<ChainId, ProviderError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn signer(&self) -> std::result::Result<Arc<dyn Signer>, ProviderError> {
        let address = self
            .authorized
            .lock()
            .unwrap()
            .first()
            .copied()
            .ok_or_else(|| ProviderError::new(4100, "unauthorized"))?;
        Ok(Arc::new(MockSigner {
            address,
            signed: self.signed.clone(),
        }))
    }

    fn subscribe(&self, _inbox: mpsc::Sender<WalletEvent>) -> Subscription {
        Subscription::detached()
    }
}

pub struct MockSigner {
    address: Address,
    signed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Signer for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_message(&self, message: &[u8]) -> std::result::Result<Vec<u8>, ProviderError> {
        self.signed
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(message).into_owned());
        Ok(vec![0x5a; 65])
    }
}

// ── Contract ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    AddEmployee(Address, EncryptedInput, EncryptedInput),
    UpdateSalary(Address, EncryptedInput, EncryptedInput),
    RemoveEmployee(Address),
    Deposit(EncryptedInput),
    ProcessPayroll,
    Withdraw,
}

pub struct MockPayroll {
    pub employer: Address,
    pub employees: Mutex<HashMap<Address, EmployeeInfo>>,
    /// Ciphertext handles served for balances and net salaries.
    pub handles: Mutex<HashMap<Address, Vec<u8>>>,
    pub fail_employer: AtomicBool,
    pub revert_writes: AtomicBool,
    pub writes: Mutex<Vec<Write>>,
}

impl MockPayroll {
    pub fn new(employer: Address) -> Self {
        Self {
            employer,
            employees: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
            fail_employer: AtomicBool::new(false),
            revert_writes: AtomicBool::new(false),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_employee(self, employee: Address) -> Self {
        self.employees.lock().unwrap().insert(
            employee,
            EmployeeInfo {
                is_active: true,
                last_payment_date: 0,
                hire_date: 1_700_000_000,
            },
        );
        self
    }

    pub fn with_handle(self, employee: Address, handle: Vec<u8>) -> Self {
        self.handles.lock().unwrap().insert(employee, handle);
        self
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    fn submit(&self, write: Write) -> Result<TxReceipt> {
        if self.revert_writes.load(Ordering::SeqCst) {
            return Err(SessionError::TransactionReverted("Only employer".into()));
        }
        let mut writes = self.writes.lock().unwrap();
        writes.push(write);
        Ok(TxReceipt {
            transaction_hash: B256::repeat_byte(writes.len() as u8),
            block_number: Some(writes.len() as u64),
        })
    }

    fn handle(&self, employee: Address) -> Result<Vec<u8>> {
        self.handles
            .lock()
            .unwrap()
            .get(&employee)
            .cloned()
            .ok_or_else(|| SessionError::Contract("no handle".into()))
    }
}

#[async_trait]
impl PayrollContract for MockPayroll {
    async fn employer(&self) -> Result<Address> {
        if self.fail_employer.load(Ordering::SeqCst) {
            return Err(SessionError::Contract("call exception".into()));
        }
        Ok(self.employer)
    }

    async fn employee_info(&self, employee: Address) -> Result<EmployeeInfo> {
        self.employees
            .lock()
            .unwrap()
            .get(&employee)
            .copied()
            .ok_or_else(|| SessionError::Contract("Employee not found".into()))
    }

    async fn active_employee_count(&self) -> Result<u64> {
        let employees = self.employees.lock().unwrap();
        Ok(employees.values().filter(|info| info.is_active).count() as u64)
    }

    async fn employee_addresses(&self) -> Result<Vec<Address>> {
        let mut addresses: Vec<Address> = self.employees.lock().unwrap().keys().copied().collect();
        addresses.sort();
        Ok(addresses)
    }

    async fn encrypted_balance(&self, employee: Address) -> Result<Vec<u8>> {
        self.handle(employee)
    }

    async fn encrypted_net_salary(&self, employee: Address) -> Result<Vec<u8>> {
        self.handle(employee)
    }

    async fn event_history(&self, from_block: u64) -> Result<Vec<PayrollEvent>> {
        let events = self
            .writes()
            .iter()
            .enumerate()
            .map(|(i, write)| {
                let (kind, subject) = match write {
                    Write::AddEmployee(a, ..) => (PayrollEventKind::EmployeeAdded, Some(*a)),
                    Write::UpdateSalary(a, ..) => (PayrollEventKind::SalaryUpdated, Some(*a)),
                    Write::RemoveEmployee(a) => (PayrollEventKind::EmployeeRemoved, Some(*a)),
                    Write::Deposit(_) => (PayrollEventKind::FundsDeposited, Some(self.employer)),
                    Write::ProcessPayroll => (PayrollEventKind::PayrollProcessed, None),
                    // The mock does not track which signer withdrew.
                    Write::Withdraw => (PayrollEventKind::BalanceWithdrawn, None),
                };
                PayrollEvent {
                    kind,
                    subject,
                    block_number: i as u64 + 1,
                    transaction_hash: B256::repeat_byte(i as u8 + 1),
                }
            })
            .filter(|event| event.block_number >= from_block)
            .collect();
        Ok(events)
    }

    async fn add_employee(
        &self,
        employee: Address,
        gross_salary: &EncryptedInput,
        tax_rate: &EncryptedInput,
    ) -> Result<TxReceipt> {
        self.submit(Write::AddEmployee(
            employee,
            gross_salary.clone(),
            tax_rate.clone(),
        ))
    }

    async fn update_salary(
        &self,
        employee: Address,
        gross_salary: &EncryptedInput,
        tax_rate: &EncryptedInput,
    ) -> Result<TxReceipt> {
        self.submit(Write::UpdateSalary(
            employee,
            gross_salary.clone(),
            tax_rate.clone(),
        ))
    }

    async fn remove_employee(&self, employee: Address) -> Result<TxReceipt> {
        self.submit(Write::RemoveEmployee(employee))
    }

    async fn deposit_funds(&self, amount: &EncryptedInput) -> Result<TxReceipt> {
        self.submit(Write::Deposit(amount.clone()))
    }

    async fn process_payroll(&self) -> Result<TxReceipt> {
        self.submit(Write::ProcessPayroll)
    }

    async fn withdraw_balance(&self) -> Result<TxReceipt> {
        self.submit(Write::Withdraw)
    }
}

pub struct MockBinder(pub Arc<MockPayroll>);

impl ContractBinder for MockBinder {
    fn payroll(&self, _signer: Arc<dyn Signer>) -> Arc<dyn PayrollContract> {
        self.0.clone()
    }
}

// ── Encryption ────────────────────────────────────────────────────────────────

pub struct MockFetcher {
    response: Mutex<std::result::Result<String, GatewayError>>,
    pub calls: AtomicUsize,
}

impl MockFetcher {
    pub fn serving(key: &str) -> Self {
        Self {
            response: Mutex::new(Ok(key.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: GatewayError) -> Self {
        Self {
            response: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublicKeyFetcher for MockFetcher {
    async fn public_key(&self, _gateway_url: &str) -> std::result::Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.lock().unwrap().clone()
    }
}

/// Backend whose sessions "encrypt" to big-endian bytes and record every
/// plaintext they see.
#[derive(Default)]
pub struct MockBackend {
    pub fail: AtomicBool,
    pub opened: Mutex<Vec<SessionParams>>,
    pub encrypted: Arc<Mutex<Vec<u64>>>,
}

impl MockBackend {
    pub fn encrypted(&self) -> Vec<u64> {
        self.encrypted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CipherBackend for MockBackend {
    async fn open(&self, params: &SessionParams) -> Result<Arc<dyn CipherSession>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SessionError::Config("backend refused parameters".into()));
        }
        self.opened.lock().unwrap().push(params.clone());
        Ok(Arc::new(MockCipher {
            encrypted: self.encrypted.clone(),
        }))
    }
}

struct MockCipher {
    encrypted: Arc<Mutex<Vec<u64>>>,
}

#[async_trait]
impl CipherSession for MockCipher {
    async fn encrypt_u64(&self, value: u64) -> Result<EncryptedInput> {
        self.encrypted.lock().unwrap().push(value);
        Ok(EncryptedInput {
            ciphertext: value.to_be_bytes().to_vec(),
            proof: vec![0xaa],
        })
    }

    async fn decrypt(&self, ciphertext: &[u8], authorization: &Authorization) -> Result<u64> {
        if authorization.signature.is_empty() {
            return Err(SessionError::DecryptionFailed("unsigned".into()));
        }
        let bytes: [u8; 8] = ciphertext
            .try_into()
            .map_err(|_| SessionError::DecryptionFailed("bad handle".into()))?;
        Ok(u64::from_be_bytes(bytes))
    }
}

// ── Harness ───────────────────────────────────────────────────────────────────

/// One controller wired to mocks the test can still inspect.
pub struct Harness {
    pub wallet: Arc<MockWallet>,
    pub payroll: Arc<MockPayroll>,
    pub fetcher: Arc<MockFetcher>,
    pub backend: Arc<MockBackend>,
    pub notifier: Arc<RecordingNotifier>,
    pub controller: SessionController,
}

impl Harness {
    pub fn new(wallet: MockWallet, payroll: MockPayroll, fetcher: MockFetcher) -> Self {
        Self::with_binding(wallet, payroll, fetcher, ChainBinding::Sticky)
    }

    pub fn with_binding(
        wallet: MockWallet,
        payroll: MockPayroll,
        fetcher: MockFetcher,
        binding: ChainBinding,
    ) -> Self {
        let wallet = Arc::new(wallet);
        let payroll = Arc::new(payroll);
        let fetcher = Arc::new(fetcher);
        let backend = Arc::new(MockBackend::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = EncryptionSessionManager::new(
            NetworkRegistry::default(),
            fetcher.clone(),
            backend.clone(),
            binding,
        );
        let controller = SessionController::new(
            Some(wallet.clone() as Arc<dyn WalletProvider>),
            Arc::new(MockBinder(payroll.clone())),
            manager,
            notifier.clone(),
        )
        .with_reconnect_delay(std::time::Duration::ZERO);
        Self {
            wallet,
            payroll,
            fetcher,
            backend,
            notifier,
            controller,
        }
    }
}
