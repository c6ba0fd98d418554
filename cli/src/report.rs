//! Table rendering for the `employees`, `history` and `status` commands.
//!
//! # Example output
//!
//! ```text
//! ╭──────────────────────────────────────────────┬────────┬────────────┬────────────╮
//! │ Employee                                     │ Status │ Hired      │ Last paid  │
//! ╞══════════════════════════════════════════════╪════════╪════════════╪════════════╡
//! │ 0x70997970C51812dc3A010C7d01b50e0d17dc79C8   │ Active │ 2024-12-01 │ never      │
//! ╰──────────────────────────────────────────────┴────────┴────────────┴────────────╯
//! ```

use chrono::DateTime;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Table};
use payroll_session::{Address, ChainId, EmployeeInfo, NetworkRegistry, PayrollEvent, Session};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

// ── Tables ────────────────────────────────────────────────────────────────────

pub fn roster(entries: &[(Address, EmployeeInfo)]) -> Table {
    let mut out = table(vec!["Employee", "Status", "Hired", "Last paid"]);
    for (address, info) in entries {
        out.add_row(vec![
            Cell::new(address.to_checksum(None)),
            Cell::new(if info.is_active { "Active" } else { "Inactive" }),
            Cell::new(format_date(info.hire_date)),
            Cell::new(format_date(info.last_payment_date)),
        ]);
    }
    out
}

pub fn history(events: &[PayrollEvent], registry: &NetworkRegistry, chain_id: ChainId) -> Table {
    let mut out = table(vec!["Block", "Event", "Account", "Transaction"]);
    for event in events {
        let hash = event.transaction_hash.to_string();
        let tx = registry
            .tx_explorer_url(chain_id, &hash)
            .unwrap_or_else(|| truncate(&hash, 18));
        out.add_row(vec![
            Cell::new(event.block_number),
            Cell::new(event.kind),
            Cell::new(
                event
                    .subject
                    .map(|a| a.to_checksum(None))
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(tx),
        ]);
    }
    out
}

pub fn status(session: &Session, registry: &NetworkRegistry) -> Table {
    let mut out = table(vec!["Field", "Value"]);
    let account = session
        .account
        .map(|a| a.to_checksum(None))
        .unwrap_or_else(|| "not connected".into());
    let network = session
        .chain_id
        .map(|id| format!("{} ({id})", registry.display_name(id)))
        .unwrap_or_else(|| "-".into());
    let role = session
        .role()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".into());
    let encryption = match &session.encryption {
        Some(handle) => format!("active on chain {}", handle.chain_id()),
        None => "unavailable".into(),
    };
    let views = session
        .reachable_views()
        .iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join(", ");

    out.add_row(vec!["Account", account.as_str()]);
    out.add_row(vec!["Network", network.as_str()]);
    out.add_row(vec!["Role", role.as_str()]);
    out.add_row(vec!["Encryption", encryption.as_str()]);
    out.add_row(vec!["Views", views.as_str()]);
    if let (Some(account), Some(chain_id)) = (session.account, session.chain_id) {
        if let Some(url) = registry.address_explorer_url(chain_id, &account) {
            out.add_row(vec!["Explorer", url.as_str()]);
        }
    }
    out
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// `YYYY-MM-DD` for a unix timestamp; `0` means the event never happened.
pub fn format_date(timestamp: u64) -> String {
    if timestamp == 0 {
        return "never".into();
    }
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Truncate a string and append "…" if longer than `max` characters.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_owned()
    } else {
        format!("{}…", &s[..max])
    }
}
