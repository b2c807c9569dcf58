//! Display helpers for amounts, prices, durations and addresses.

use crate::PAYMENT_CURRENCY;

/// `0.001` -> `$0.0010 USDC`.
pub fn format_usdc(amount: f64) -> String {
    format!("${amount:.4} {PAYMENT_CURRENCY}")
}

/// Same as [`format_usdc`] for the string amounts the gateway sends.
/// Unparseable input is returned as `<input> USDC`.
pub fn format_usdc_str(amount: &str) -> String {
    match amount.trim().parse::<f64>() {
        Ok(value) => format_usdc(value),
        Err(_) => format!("{amount} {PAYMENT_CURRENCY}"),
    }
}

/// `450` -> `450ms`, `1500` -> `1.50s`, `90000` -> `1.50m`.
pub fn format_duration(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1_000.0)
    } else {
        format!("{:.2}m", ms as f64 / 60_000.0)
    }
}

/// `0x` followed by exactly 40 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// `0x1234...abcd`. Anything that is not an address comes back unchanged.
pub fn truncate_address(address: &str) -> String {
    if !is_valid_address(address) {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Two decimals with separators from $1,000; four from $1; eight below.
pub fn format_crypto_price(price: f64) -> String {
    if price >= 1_000.0 {
        let fixed = format!("{price:.2}");
        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));
        format!("${}.{frac_part}", group_thousands(int_part))
    } else if price >= 1.0 {
        format!("${price:.4}")
    } else {
        format!("${price:.8}")
    }
}

/// `1.234` -> `🟢 ▲ 1.23%`, `-0.5` -> `🔴 ▼ 0.50%`.
pub fn format_price_change(change: f64) -> String {
    let (color, arrow) = if change >= 0.0 {
        ("🟢", "▲")
    } else {
        ("🔴", "▼")
    };
    format!("{color} {arrow} {:.2}%", change.abs())
}

/// Indented JSON for terminal output.
pub fn pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
