//! Utility functions and helpers

use rust_decimal::Decimal;

/// Format an integer part with thousands separators
pub fn format_number<T: ToString>(n: T) -> String {
    let s = n.to_string();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest.to_string()),
        None => ("", s),
    };
    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push(' ');
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    let grouped: String = result.chars().rev().collect();
    format!("{}{}", sign, grouped)
}

/// Format a payment amount for display, e.g. `1 250.50 ₽`
pub fn format_amount(amount: &Decimal) -> String {
    let normalized = amount.normalize();
    let text = normalized.to_string();
    match text.split_once('.') {
        Some((int_part, frac)) => {
            let frac = if frac.len() == 1 { format!("{}0", frac) } else { frac.to_string() };
            format!("{}.{} ₽", format_number(int_part), frac)
        }
        None => format!("{} ₽", format_number(text)),
    }
}

/// Escape text for safe interpolation into HTML content and attributes
pub fn escape_html(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Object name for an uploaded receipt: `{user_id}/{millis}_{file_name}`
///
/// Path separators and whitespace in the original file name are replaced so
/// the name stays inside the user's folder.
pub fn receipt_object_name(user_id: &str, millis: u128, file_name: &str) -> String {
    let cleaned: String = file_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ' ' | '\t' | '\n' | '?' | '#' => '_',
            other => other,
        })
        .collect();
    let cleaned = if cleaned.is_empty() { "receipt".to_string() } else { cleaned };
    format!("{}/{}_{}", user_id, millis, cleaned)
}
