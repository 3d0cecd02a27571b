//! Customer-facing notices for committed postings.

use rust_decimal::Decimal;
use autoledger_shared::Notification;

use crate::ledger::entry::LedgerEntry;
use crate::ledger::holder::BalanceHolder;
use crate::ledger::types::MovementType;

/// Builds the notice for a committed primary posting.
///
/// Payments thank the credited holder, bills warn the debited holder. Other
/// movements, and postings without a phone number, produce no notice.
#[must_use]
pub fn notice_for(
    entry: &LedgerEntry,
    debit: &BalanceHolder,
    credit: &BalanceHolder,
    currency_label: &str,
) -> Option<Notification> {
    let to = entry.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
    let amount = format_amount(entry.amount);

    let body = match entry.movement_type {
        MovementType::Payment => format!(
            "Hello {}, your payment of {currency_label} {amount} has been received",
            credit.name
        ),
        MovementType::Bill => format!(
            "Hello {}, please note that you have a bill of {currency_label} {amount}.",
            debit.name
        ),
        _ => return None,
    };

    Some(Notification {
        to: to.to_string(),
        body,
    })
}

/// Formats an amount with thousands separators.
///
/// Whole amounts print without decimals; anything else prints to the cent.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let text = if rounded.fract().is_zero() {
        rounded.trunc().abs().to_string()
    } else {
        format!("{:.2}", rounded.abs())
    };
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(text.len() + whole.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        grouped.push('-');
    }
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}
