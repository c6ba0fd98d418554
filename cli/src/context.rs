//! Wiring from [`ClientConfig`] to a live [`SessionController`].

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use payroll_rpc::{Confirmation, HttpGateway, JsonRpcClient, RpcContracts, RpcWallet};
use payroll_session::{
    ClientConfig, EncryptionSessionManager, Notice, NoticeLevel, Notifier, Session,
    SessionController, SessionError, WalletProvider,
};

/// Prints notices to stderr so they never mix with command output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warn",
            NoticeLevel::Error => "error",
        };
        if let Some(err) = &notice.error {
            tracing::debug!(kind = ?notice.kind, error = %err, "notice");
        }
        eprintln!("[{tag}] {}", notice.message);
    }
}

/// Build a controller talking to `config.rpc_url` and the configured gateways.
pub fn build(config: &ClientConfig, notifier: Arc<dyn Notifier>) -> Result<SessionController> {
    let timeout = config.request_timeout();
    let client = Arc::new(
        JsonRpcClient::new(config.rpc_url.clone(), timeout)
            .context("Failed to build the RPC client")?,
    );
    let wallet = RpcWallet::new(Arc::clone(&client), config.poll_interval());
    let contracts =
        RpcContracts::new(client, config.payroll()?).with_confirmation(Confirmation {
            interval: config.confirmation_interval(),
            attempts: config.confirmation_attempts,
        });
    let gateway = Arc::new(
        HttpGateway::new(timeout).context("Failed to build the gateway client")?,
    );
    let manager = EncryptionSessionManager::new(
        config.registry(),
        gateway.clone(),
        gateway,
        config.chain_binding,
    );

    Ok(SessionController::new(
        Some(Arc::new(wallet) as Arc<dyn WalletProvider>),
        Arc::new(contracts),
        manager,
        notifier,
    )
    .with_reconnect_delay(config.reconnect_delay())
    .with_decimals(config.decimals))
}

/// Attach `err`'s guidance so the final report tells the user what to do.
pub fn explain(err: SessionError) -> anyhow::Error {
    anyhow!("{err}\n{}", err.guidance())
}

/// Connect, turning a failure into an actionable error.
pub async fn connect(controller: &SessionController) -> Result<Session> {
    controller.connect().await.map_err(explain)
}
