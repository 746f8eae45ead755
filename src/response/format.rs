//! Value formatting for natural-language replies.

use serde_json::Value;

const CURRENCY_HINTS: &[&str] = &["sales", "revenue", "amount", "total", "price", "average"];
const QUANTITY_HINTS: &[&str] = &["count", "quantity", "number"];

/// Insert thousands separators into a run of ASCII digits.
pub fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `$1,234,567.80`; negatives render as `-$12.50`.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, group_thousands(whole), cents)
}

fn format_integer(value: i128) -> String {
    let grouped = group_thousands(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Numeric view of a JSON value, accepting numeric strings.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Whole numbers get separators; everything else is shown as-is.
pub fn format_plain(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                format_integer(i as i128)
            } else if let Some(u) = n.as_u64() {
                format_integer(u as i128)
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format_integer(f as i128),
                    _ => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}

pub fn format_value(value: &Value, currency: bool) -> String {
    if currency {
        if let Some(amount) = as_number(value) {
            return format_currency(amount);
        }
    }
    format_plain(value)
}

/// Does free text talk about money?
pub fn mentions_currency(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("sales") || text.contains("revenue") || text.contains('$')
}

/// Column names that hold money rather than counts.
pub fn is_currency_column(name: &str) -> bool {
    let name = name.to_lowercase();
    CURRENCY_HINTS.iter().any(|hint| name.contains(hint))
        && !QUANTITY_HINTS.iter().any(|hint| name.contains(hint))
}
