//! Presentation helpers over the "net of change" projection.
//!
//! These functions expect the projection produced by
//! [`TxInfo::without_change`]; the scheduler only classifies transactions
//! touching owned addresses, so a purely external, uninvolved transaction
//! never reaches this layer.

use super::txio::{TxInfo, TxIo};
use crate::ledger::{Account, AccountId, Satoshis};

/// One human-readable line describing a movement.
///
/// `amount` is attached only when the transaction fans out to several
/// destinations and the per-leg split matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub text: String,
    pub amount: Option<Satoshis>,
}

/// Net amount of the projection from the perspective of the registry's
/// accounts.
///
/// While owned legs survive, the net is what the accounts received minus
/// what they spent. Once the owning account has been netted out of the
/// projection, the surviving legs are all external and the flow it funded
/// (or was funded by) is read from them instead: external inputs minus
/// external outputs. An empty projection nets to zero.
pub fn net_amount(info: &TxInfo) -> Satoshis {
    let owned_survives = info
        .inputs
        .iter()
        .chain(info.outputs.iter())
        .any(|io| io.is_owned());
    if owned_survives {
        let received: Satoshis = info
            .outputs
            .iter()
            .filter(|io| io.is_owned())
            .map(|io| io.amount())
            .sum();
        let spent: Satoshis = info
            .inputs
            .iter()
            .filter(|io| io.is_owned())
            .map(|io| io.amount())
            .sum();
        received - spent
    } else {
        let funded: Satoshis = info.inputs.iter().map(|io| io.amount()).sum();
        let sent: Satoshis = info.outputs.iter().map(|io| io.amount()).sum();
        funded - sent
    }
}

/// Title for the projection.
pub fn title(info: &TxInfo) -> &'static str {
    if info.is_empty() {
        return "Empty transaction";
    }
    let net = net_amount(info);
    if net.is_negative() {
        "Bitcoin sent"
    } else if net > Satoshis::ZERO {
        "Bitcoin received"
    } else {
        "Internal transfer"
    }
}

/// Per-destination subtitle lines, with account names resolved against the
/// given registry snapshot.
pub fn subtitles(info: &TxInfo, accounts: &[Account]) -> Vec<Subtitle> {
    if info.is_empty() {
        return Vec::new();
    }

    let net = net_amount(info);
    let senders = sender_labels(info, accounts, net);
    let from = if senders.is_empty() {
        "external".to_string()
    } else {
        senders.join(", ")
    };

    let destinations = destination_labels(info, accounts, net);
    if destinations.len() == 1 {
        vec![Subtitle {
            text: format!("From {} to {}", from, destinations[0].0),
            amount: None,
        }]
    } else {
        destinations
            .into_iter()
            .map(|(label, amount)| Subtitle {
                text: format!("From {} to {}", from, label),
                amount: Some(amount),
            })
            .collect()
    }
}

/// Who the movement came from: surviving owned inputs when present, the
/// netted account for a spend, the external input addresses otherwise.
fn sender_labels(info: &TxInfo, accounts: &[Account], net: Satoshis) -> Vec<String> {
    let owned_inputs = involved_names(
        accounts,
        info.inputs.iter().filter_map(|io| io.account()),
    );
    if !owned_inputs.is_empty() {
        return owned_inputs;
    }
    if net.is_negative() {
        return involved_names(accounts, info.involved_accounts.iter().copied());
    }
    info.inputs
        .iter()
        .map(|io| io.address().to_string())
        .collect()
}

/// Where the movement went: one entry per surviving output leg, or the
/// receiving accounts when the owned outputs were netted out.
fn destination_labels(
    info: &TxInfo,
    accounts: &[Account],
    net: Satoshis,
) -> Vec<(String, Satoshis)> {
    if info.outputs.is_empty() {
        return involved_names(accounts, info.involved_accounts.iter().copied())
            .into_iter()
            .map(|name| (name, net.abs()))
            .collect();
    }
    info.outputs
        .iter()
        .map(|io| match io {
            TxIo::External { address, amount } => (address.clone(), *amount),
            TxIo::Address {
                account, amount, ..
            }
            | TxIo::Pool {
                account, amount, ..
            } => (
                account_name(accounts, *account).unwrap_or_else(|| account.to_string()),
                *amount,
            ),
        })
        .collect()
}

fn account_name(accounts: &[Account], id: AccountId) -> Option<String> {
    accounts
        .iter()
        .find(|a| a.id() == id)
        .map(|a| a.name().to_string())
}

fn involved_names(accounts: &[Account], ids: impl Iterator<Item = AccountId>) -> Vec<String> {
    let mut names = Vec::new();
    for id in ids {
        if let Some(name) = account_name(accounts, id) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}
