use crate::ledger::Satoshis;

/// Number of decimal places separating satoshis from whole bitcoins.
pub const BTC_DECIMALS: u32 = 8;

/// Render a satoshi amount as a BTC string for logs and summaries.
pub fn format_btc_amount(amount: Satoshis) -> String {
    format!(
        "{:.*}",
        BTC_DECIMALS as usize,
        amount.value() as f64 / 10f64.powi(BTC_DECIMALS as i32)
    )
}
