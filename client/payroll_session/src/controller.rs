//! Session Controller: owns the session record and runs the connect
//! pipeline, disconnects, and wallet notifications.
//!
//! The controller is driven from one cooperative task. Its methods take
//! `&self` so a front end can hold it behind an `Arc`, but they are meant to
//! be awaited from the same context that owns the inbox passed to
//! [`SessionController::run`].
//!
//! # Pipeline
//! ```text
//! connect()
//!   ├─ wallet::establish      accounts → (prompt) → signer → chain id
//!   ├─ role::resolve_role     failure → RoleUnknown notice, flags cleared
//!   ├─ encryption.initialize  failure → EncryptionDegraded notice, no handle
//!   └─ commit                 ready = true, Connected notice
//! ```
//! Only failures in the wallet stage abort the pipeline; they leave the
//! session fully disconnected.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};

use crate::codec::DEFAULT_DECIMALS;
use crate::contract::ContractBinder;
use crate::encryption::{EncryptionSession, EncryptionSessionManager};
use crate::error::{Result, SessionError};
use crate::notify::{Notice, NoticeKind, NoticeLevel, Notifier};
use crate::payroll::PayrollClient;
use crate::role;
use crate::types::{short_address, Address, ChainId, Role, RoleFlags, View};
use crate::wallet::{self, Signer, Subscription, WalletEvent, WalletProvider};

/// Inbox depth for wallet notifications.
pub const INBOX_CAPACITY: usize = 16;

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(500);

// ── Session record ────────────────────────────────────────────────────────────

/// Snapshot of the client-side session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub account: Option<Address>,
    pub chain_id: Option<ChainId>,
    pub roles: RoleFlags,
    pub encryption: Option<Arc<EncryptionSession>>,
    pub ready: bool,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    /// True when no field carries connection state.
    pub fn is_empty(&self) -> bool {
        self.account.is_none()
            && self.chain_id.is_none()
            && self.roles == RoleFlags::default()
            && self.encryption.is_none()
            && !self.ready
    }

    /// The deciding role; `None` while disconnected.
    pub fn role(&self) -> Option<Role> {
        self.account.map(|_| self.roles.role())
    }

    pub fn reachable_views(&self) -> Vec<View> {
        match self.role() {
            None => vec![View::Connect],
            Some(Role::Employer) => vec![View::Home, View::EmployerDashboard],
            Some(Role::Employee) => vec![View::Home, View::EmployeeDashboard],
            Some(Role::Neither) => vec![View::Home],
        }
    }
}

/// Result of handling one wallet notification.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Disconnected,
    Reconnected(Session),
    ReconnectFailed(SessionError),
    /// Derived state is void; the owner must rebuild the whole context.
    ReloadRequired(ChainId),
}

/// Why [`SessionController::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerExit {
    Reload { chain_id: ChainId },
    InboxClosed,
}

// ── Controller ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct State {
    session: Session,
    signer: Option<Arc<dyn Signer>>,
}

pub struct SessionController {
    wallet: Option<Arc<dyn WalletProvider>>,
    contracts: Arc<dyn ContractBinder>,
    encryption: Mutex<EncryptionSessionManager>,
    state: RwLock<State>,
    notifier: Arc<dyn Notifier>,
    connecting: AtomicBool,
    /// Bumped by every teardown; a pipeline that started in an older epoch
    /// must not commit.
    epoch: AtomicU64,
    reconnect_delay: Duration,
    decimals: u32,
}

impl SessionController {
    pub fn new(
        wallet: Option<Arc<dyn WalletProvider>>,
        contracts: Arc<dyn ContractBinder>,
        encryption: EncryptionSessionManager,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            wallet,
            contracts,
            encryption: Mutex::new(encryption),
            state: RwLock::new(State::default()),
            notifier,
            connecting: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            decimals: DEFAULT_DECIMALS,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    pub async fn session(&self) -> Session {
        self.state.read().await.session.clone()
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    /// Connect if the wallet already has an authorized account; never prompts.
    pub async fn restore(&self) -> Result<Option<Session>> {
        let Some(wallet) = &self.wallet else {
            return Ok(None);
        };
        match wallet.accounts().await {
            Ok(accounts) if !accounts.is_empty() => self.connect().await.map(Some),
            Ok(_) => Ok(None),
            Err(err) => {
                tracing::warn!(error = %err, "could not query authorized accounts");
                Ok(None)
            }
        }
    }

    /// Run the connect pipeline.
    ///
    /// # Errors
    /// [`SessionError::ConnectionInProgress`] if another attempt is in flight
    /// (nothing else happens), [`SessionError::ProviderUnavailable`], or a
    /// wallet-stage failure. Role and encryption failures do not fail the
    /// call.
    pub async fn connect(&self) -> Result<Session> {
        let Some(_flight) = FlightGuard::acquire(&self.connecting) else {
            tracing::warn!("connection already in progress");
            return Err(SessionError::ConnectionInProgress);
        };

        let Some(wallet) = self.wallet.clone() else {
            let err = SessionError::ProviderUnavailable;
            self.notifier
                .notify(Notice::from_error(NoticeKind::ConnectionFailed, &err));
            return Err(err);
        };

        let epoch = self.epoch.load(Ordering::Acquire);
        match self.run_pipeline(wallet.as_ref(), epoch).await {
            Ok(session) => Ok(session),
            Err(err) => {
                tracing::warn!(error = %err, "connect failed");
                self.teardown().await;
                self.notifier
                    .notify(Notice::from_error(NoticeKind::ConnectionFailed, &err));
                Err(err)
            }
        }
    }

    /// Clear the session and release the encryption handle. Idempotent.
    pub async fn disconnect(&self) {
        self.teardown().await;
        self.notifier.notify(Notice::new(
            NoticeKind::Disconnected,
            NoticeLevel::Success,
            "Disconnected",
        ));
    }

    /// React to one wallet notification.
    pub async fn handle_event(&self, event: WalletEvent) -> EventOutcome {
        match event {
            WalletEvent::AccountsChanged(accounts) if accounts.is_empty() => {
                tracing::info!("wallet reports no accounts");
                self.disconnect().await;
                EventOutcome::Disconnected
            }
            WalletEvent::AccountsChanged(accounts) => self.account_change(accounts, None).await,
            WalletEvent::ChainChanged(chain_id) => self.chain_change(chain_id).await,
        }
    }

    /// Subscribe to the wallet's notifications.
    pub fn subscribe(&self) -> Result<(Subscription, mpsc::Receiver<WalletEvent>)> {
        let wallet = self.wallet.as_ref().ok_or(SessionError::ProviderUnavailable)?;
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        Ok((wallet.subscribe(tx), rx))
    }

    /// Process notifications one at a time until a chain change or until
    /// the inbox closes.
    pub async fn run(&self, mut inbox: mpsc::Receiver<WalletEvent>) -> ControllerExit {
        while let Some(event) = inbox.recv().await {
            tracing::debug!(?event, "wallet event");
            let outcome = match event {
                WalletEvent::AccountsChanged(accounts) if !accounts.is_empty() => {
                    self.account_change(accounts, Some(&mut inbox)).await
                }
                other => self.handle_event(other).await,
            };
            if let EventOutcome::ReloadRequired(chain_id) = outcome {
                return ControllerExit::Reload { chain_id };
            }
        }
        ControllerExit::InboxClosed
    }

    /// Payroll operations for the connected account.
    pub async fn payroll(&self) -> Result<PayrollClient> {
        let state = self.state.read().await;
        let signer = state.signer.clone().ok_or(SessionError::NotConnected)?;
        let contract = self.contracts.payroll(signer.clone());
        Ok(PayrollClient::new(
            contract,
            signer,
            state.session.encryption.clone(),
            self.decimals,
        ))
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// Disconnect, let the wallet settle, then reconnect once.
    ///
    /// With an inbox, notifications that queued up during the settle delay
    /// are folded in: the last account list decides whether to reconnect and
    /// a chain change overrides everything.
    async fn account_change(
        &self,
        accounts: Vec<Address>,
        inbox: Option<&mut mpsc::Receiver<WalletEvent>>,
    ) -> EventOutcome {
        tracing::info!(primary = %accounts[0], "wallet account changed");
        self.disconnect().await;
        tokio::time::sleep(self.reconnect_delay).await;

        let mut latest = accounts;
        if let Some(inbox) = inbox {
            let mut coalesced = 0usize;
            while let Ok(queued) = inbox.try_recv() {
                match queued {
                    WalletEvent::AccountsChanged(accounts) => {
                        latest = accounts;
                        coalesced += 1;
                    }
                    WalletEvent::ChainChanged(chain_id) => return self.chain_change(chain_id).await,
                }
            }
            if coalesced > 0 {
                tracing::debug!(coalesced, "coalesced queued account changes");
            }
        }

        if latest.is_empty() {
            return EventOutcome::Disconnected;
        }
        match self.connect().await {
            Ok(session) => EventOutcome::Reconnected(session),
            Err(err) => EventOutcome::ReconnectFailed(err),
        }
    }

    async fn chain_change(&self, chain_id: ChainId) -> EventOutcome {
        tracing::info!(chain_id, "wallet chain changed, context reload required");
        self.teardown().await;
        EventOutcome::ReloadRequired(chain_id)
    }

    async fn run_pipeline(&self, wallet: &dyn WalletProvider, epoch: u64) -> Result<Session> {
        let notifier = self.notifier.clone();
        let connection = wallet::establish(wallet, || {
            notifier.notify(Notice::new(
                NoticeKind::AuthorizationRequested,
                NoticeLevel::Info,
                "Requesting wallet connection...",
            ))
        })
        .await?;

        let contract = self.contracts.payroll(connection.signer.clone());
        let roles = match role::resolve_role(connection.account, contract.as_ref()).await {
            Ok(roles) => roles,
            Err(err) => {
                tracing::warn!(error = %err, "role resolution failed");
                self.notifier
                    .notify(Notice::from_error(NoticeKind::RoleUnknown, &err));
                RoleFlags::default()
            }
        };

        let encryption = {
            let mut manager = self.encryption.lock().await;
            match manager.initialize_for(connection.chain_id).await {
                Ok(session) => Some(session),
                Err(err) => {
                    tracing::warn!(error = %err, "continuing without encryption");
                    self.notifier
                        .notify(Notice::from_error(NoticeKind::EncryptionDegraded, &err));
                    None
                }
            }
        };

        let session = Session {
            account: Some(connection.account),
            chain_id: Some(connection.chain_id),
            roles,
            encryption,
            ready: true,
        };

        {
            let mut state = self.state.write().await;
            if self.epoch.load(Ordering::Acquire) != epoch {
                return Err(SessionError::ConnectionFailed(
                    "disconnected while connecting".into(),
                ));
            }
            state.session = session.clone();
            state.signer = Some(connection.signer);
        }

        self.notifier.notify(Notice::new(
            NoticeKind::Connected,
            NoticeLevel::Success,
            format!("Connected: {}", short_address(&connection.account)),
        ));
        Ok(session)
    }

    async fn teardown(&self) {
        let mut state = self.state.write().await;
        let mut manager = self.encryption.lock().await;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        state.session = Session::default();
        state.signer = None;
        manager.reset();
    }
}

/// Holds the single-flight flag for the duration of one `connect()`.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
