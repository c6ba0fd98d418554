//! FHE Payroll CLI: wallet session, role detection and confidential payroll
//! operations against the FHE payroll contract.
//!
//! # Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init-config` | Write the default configuration to `~/.fhe-payroll/config.toml` |
//! | `status` | Connect and print account, network, role, encryption state and reachable views |
//! | `watch` | Stay connected and follow account / chain changes reported by the wallet |
//! | `employees` | List registered employees (employer) |
//! | `add-employee <address> <salary> <tax-rate>` | Encrypt and register an employee (employer) |
//! | `update-salary <address> <salary> <tax-rate>` | Encrypt and replace an employee's salary (employer) |
//! | `remove-employee <address>` | Deactivate an employee (employer) |
//! | `deposit <amount>` | Encrypt and deposit payroll funds (employer) |
//! | `process-payroll` | Pay every active employee (employer) |
//! | `history` | Show payroll contract events |
//! | `withdraw` | Withdraw the accrued balance (employee) |
//! | `balance` | Decrypt the accrued balance (employee) |
//! | `net-salary` | Decrypt the net salary, or compute one offline with `--gross` / `--tax-rate` |
//!
//! # Logging
//!
//! Logs go to stderr, filtered by `FHE_PAYROLL_LOG` (default `info`);
//! `--verbose` switches the default to `debug`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use payroll_session::notify::LogNotifier;
use payroll_session::payroll::net_salary;
use payroll_session::{
    Amount, ClientConfig, ControllerExit, NetworkRegistry, PayrollClient, Session,
    SessionController, TxReceipt,
};
use tracing_subscriber::EnvFilter;

mod context;
mod report;

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "FHE_PAYROLL_LOG";

// ── CLI definition ────────────────────────────────────────────────────────────

/// FHE Payroll CLI: confidential payroll on an fhEVM chain.
///
/// Salaries, balances and tax rates never leave this machine in cleartext;
/// they are encrypted through the network's gateway before submission and
/// decrypted only after the connected account signs an authorization.
#[derive(Parser)]
#[command(name = "fhe-payroll")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.fhe-payroll/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the node RPC endpoint from the configuration.
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Override the payroll contract address from the configuration.
    #[arg(long, global = true)]
    payroll: Option<String>,

    /// Override how many times a transaction receipt is polled before giving up.
    #[arg(long, global = true)]
    confirm_attempts: Option<u32>,

    /// Log at debug level unless FHE_PAYROLL_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file.
    ///
    /// Leaves an existing file untouched unless --force is given.
    InitConfig {
        #[arg(long)]
        force: bool,
    },

    /// Connect and print the session summary.
    Status,

    /// Stay connected and react to wallet account and chain changes.
    ///
    /// A chain change rebuilds the whole client context from scratch.
    Watch,

    /// List registered employees.
    Employees,

    /// Register an employee with an encrypted salary and tax rate.
    AddEmployee {
        /// Employee account (0x-prefixed, 20 bytes).
        address: String,
        /// Gross salary in whole tokens, e.g. 5000.00 (at most 1,000,000).
        salary: String,
        /// Tax rate in percent, 0-100.
        tax_rate: String,
    },

    /// Replace an employee's encrypted salary and tax rate.
    UpdateSalary {
        address: String,
        salary: String,
        tax_rate: String,
    },

    /// Deactivate an employee.
    RemoveEmployee { address: String },

    /// Deposit encrypted payroll funds.
    Deposit {
        /// Amount in whole tokens.
        amount: String,
    },

    /// Pay every active employee.
    ProcessPayroll,

    /// Show payroll contract events.
    History {
        /// First block to scan.
        #[arg(long, default_value_t = 0)]
        from_block: u64,
    },

    /// Withdraw the connected employee's balance.
    Withdraw,

    /// Decrypt the connected employee's balance.
    Balance,

    /// Decrypt the connected employee's net salary.
    ///
    /// With --gross and --tax-rate, compute a net salary offline instead.
    NetSalary {
        #[arg(long, requires = "tax_rate")]
        gross: Option<String>,
        #[arg(long, requires = "gross")]
        tax_rate: Option<String>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => ClientConfig::default_path()?,
    };

    if let Commands::InitConfig { force } = cli.command {
        return cmd_init_config(&config_path, force);
    }

    let config = load_config(&cli, &config_path)?;
    if let Commands::NetSalary {
        gross: Some(gross),
        tax_rate: Some(tax_rate),
    } = &cli.command
    {
        let net = offline_net_salary(gross, tax_rate, &config)?;
        println!("Net salary: {net} tokens");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(run(cli.command, config))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli, path: &Path) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(path)
        .with_context(|| format!("Cannot load configuration from '{}'", path.display()))?;
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(payroll) = &cli.payroll {
        config.payroll_address = payroll.clone();
    }
    if let Some(attempts) = cli.confirm_attempts {
        config.confirmation_attempts = attempts;
    }
    config
        .validate()
        .with_context(|| format!("Invalid configuration in '{}'", path.display()))?;
    Ok(config)
}

async fn run(command: Commands, config: ClientConfig) -> Result<()> {
    if let Commands::Watch = command {
        return cmd_watch(&config).await;
    }

    let registry = config.registry();
    let controller = context::build(&config, Arc::new(context::ConsoleNotifier))?;
    let session = context::connect(&controller).await?;
    warn_if_unsupported(&session, &registry);

    match command {
        Commands::Status => {
            println!("{}", report::status(&session, &registry));
            Ok(())
        }
        Commands::Employees => {
            require_employer(&session)?;
            cmd_employees(&payroll(&controller).await?).await
        }
        Commands::AddEmployee {
            address,
            salary,
            tax_rate,
        } => {
            require_employer(&session)?;
            let employee = parse_address(&address)?;
            let receipt = payroll(&controller)
                .await?
                .add_employee(employee, &salary, &tax_rate)
                .await
                .map_err(context::explain)?;
            println!("Employee {employee} added.");
            print_receipt(&receipt, &session, &registry);
            Ok(())
        }
        Commands::UpdateSalary {
            address,
            salary,
            tax_rate,
        } => {
            require_employer(&session)?;
            let employee = parse_address(&address)?;
            let receipt = payroll(&controller)
                .await?
                .update_salary(employee, &salary, &tax_rate)
                .await
                .map_err(context::explain)?;
            println!("Salary of {employee} updated.");
            print_receipt(&receipt, &session, &registry);
            Ok(())
        }
        Commands::RemoveEmployee { address } => {
            require_employer(&session)?;
            let employee = parse_address(&address)?;
            let receipt = payroll(&controller)
                .await?
                .remove_employee(employee)
                .await
                .map_err(context::explain)?;
            println!("Employee {employee} removed.");
            print_receipt(&receipt, &session, &registry);
            Ok(())
        }
        Commands::Deposit { amount } => {
            require_employer(&session)?;
            let receipt = payroll(&controller)
                .await?
                .deposit_funds(&amount)
                .await
                .map_err(context::explain)?;
            println!("Deposited {amount} tokens.");
            print_receipt(&receipt, &session, &registry);
            Ok(())
        }
        Commands::ProcessPayroll => {
            require_employer(&session)?;
            let receipt = payroll(&controller)
                .await?
                .process_payroll()
                .await
                .map_err(context::explain)?;
            println!("Payroll processed.");
            print_receipt(&receipt, &session, &registry);
            Ok(())
        }
        Commands::History { from_block } => {
            let events = payroll(&controller)
                .await?
                .history(from_block)
                .await
                .map_err(context::explain)?;
            if events.is_empty() {
                println!("No payroll events found from block {from_block}.");
                return Ok(());
            }
            let chain_id = session.chain_id.unwrap_or_default();
            println!("{}", report::history(&events, &registry, chain_id));
            println!("{} event(s) found.", events.len());
            Ok(())
        }
        Commands::Withdraw => {
            require_employee(&session)?;
            let receipt = payroll(&controller)
                .await?
                .withdraw_balance()
                .await
                .map_err(context::explain)?;
            println!("Balance withdrawn.");
            print_receipt(&receipt, &session, &registry);
            Ok(())
        }
        Commands::Balance => {
            require_employee(&session)?;
            let balance = payroll(&controller)
                .await?
                .decrypt_balance()
                .await
                .map_err(context::explain)?;
            println!("Balance: {balance} tokens");
            Ok(())
        }
        Commands::NetSalary { .. } => {
            require_employee(&session)?;
            let net = payroll(&controller)
                .await?
                .decrypt_net_salary()
                .await
                .map_err(context::explain)?;
            println!("Net salary: {net} tokens");
            Ok(())
        }
        Commands::InitConfig { .. } | Commands::Watch => {
            bail!("This command does not run against a single session.")
        }
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `init-config` — write ~/.fhe-payroll/config.toml.
fn cmd_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Configuration already exists at: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    ClientConfig::default()
        .save(path)
        .with_context(|| format!("Cannot write '{}'", path.display()))?;

    // The file names the RPC endpoint and contract in use; keep it owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(dir) = path.parent() {
            std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
                .with_context(|| format!("Cannot set permissions on '{}'", dir.display()))?;
        }
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Cannot set permissions on '{}'", path.display()))?;
    }

    println!("FHE Payroll configuration written to: {}", path.display());
    Ok(())
}

/// `watch` — follow wallet notifications until interrupted.
///
/// A chain change voids every derived value, so the controller is dropped
/// and rebuilt from the configuration.
async fn cmd_watch(config: &ClientConfig) -> Result<()> {
    let registry = config.registry();
    loop {
        let controller = context::build(config, Arc::new(LogNotifier))?;
        match controller.restore().await {
            Ok(Some(session)) => {
                warn_if_unsupported(&session, &registry);
                println!("{}", report::status(&session, &registry));
            }
            Ok(None) => {
                let session = context::connect(&controller).await?;
                println!("{}", report::status(&session, &registry));
            }
            Err(err) => return Err(context::explain(err)),
        }

        let (_subscription, inbox) = controller.subscribe().map_err(context::explain)?;
        let exit = tokio::select! {
            exit = controller.run(inbox) => exit,
            _ = tokio::signal::ctrl_c() => {
                controller.disconnect().await;
                return Ok(());
            }
        };

        match exit {
            ControllerExit::Reload { chain_id } => {
                tracing::info!(chain_id, "reloading after chain change");
                println!(
                    "Network changed to {}; reconnecting.",
                    registry.display_name(chain_id)
                );
            }
            ControllerExit::InboxClosed => {
                tracing::info!("wallet notifications stopped");
                return Ok(());
            }
        }
    }
}

async fn cmd_employees(payroll: &PayrollClient) -> Result<()> {
    let roster = payroll.roster().await.map_err(context::explain)?;
    if roster.is_empty() {
        println!("No employees registered.");
        return Ok(());
    }
    let active = payroll
        .active_employee_count()
        .await
        .map_err(context::explain)?;
    println!("{}", report::roster(&roster));
    println!("{} employee(s), {active} active.", roster.len());
    Ok(())
}

/// `net-salary --gross --tax-rate`: no wallet, but the configured decimals
/// still apply so the result matches the on-chain figure.
fn offline_net_salary(gross: &str, tax_rate: &str, config: &ClientConfig) -> Result<Amount> {
    net_salary(gross, tax_rate, config.decimals).map_err(context::explain)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn payroll(controller: &SessionController) -> Result<PayrollClient> {
    controller.payroll().await.map_err(context::explain)
}

fn require_employer(session: &Session) -> Result<()> {
    if !session.roles.employer {
        bail!("The connected account is not the payroll employer.");
    }
    Ok(())
}

fn require_employee(session: &Session) -> Result<()> {
    if !session.roles.employee {
        bail!("The connected account is not a registered employee.");
    }
    Ok(())
}

fn warn_if_unsupported(session: &Session, registry: &NetworkRegistry) {
    if let Some(chain_id) = session.chain_id {
        if !registry.is_supported(chain_id) {
            eprintln!(
                "WARN: {} is not a supported network; contract calls may fail.",
                registry.display_name(chain_id)
            );
        }
    }
}

fn print_receipt(receipt: &TxReceipt, session: &Session, registry: &NetworkRegistry) {
    let hash = receipt.transaction_hash.to_string();
    match receipt.block_number {
        Some(block) => println!("  Transaction : {hash} (block {block})"),
        None => println!("  Transaction : {hash}"),
    }
    if let Some(url) = session
        .chain_id
        .and_then(|id| registry.tx_explorer_url(id, &hash))
    {
        println!("  Explorer    : {url}");
    }
}

/// Parse a 0x-prefixed 20-byte account address.
fn parse_address(text: &str) -> Result<Address> {
    let trimmed = text.trim();
    if !trimmed.starts_with("0x") || trimmed.len() != 42 {
        bail!(
            "Invalid address: '{}'\n\
             Expected 0x followed by 40 hex characters.",
            text
        );
    }
    trimmed
        .parse::<Address>()
        .with_context(|| format!("Invalid address: '{text}'"))
}
