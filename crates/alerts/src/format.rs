//! Number formatting with magnitude-dependent precision.
//!
//! These rules are part of the report's output contract; changing them
//! changes every rendered message.

/// Insert `,` between groups of three digits of an unsigned integer string.
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

/// Fixed decimals with a grouped integer part. Negative zero renders as zero.
fn grouped_fixed(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };
    let is_zero = rendered.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, group_thousands(int_part), frac),
        None => format!("{}{}", sign, group_thousands(int_part)),
    }
}

fn money(sign: &str, value: f64, decimals: usize) -> String {
    let body = grouped_fixed(value, decimals);
    match body.strip_prefix('-') {
        Some(abs) => format!("-{}{}", sign, abs),
        None => format!("{}{}", sign, body),
    }
}

/// Quantity precision: 8 dp below 0.01, 6 below 1, 2 below 1000, else 0.
pub fn format_quantity(quantity: f64) -> String {
    let abs = quantity.abs();
    let decimals = if abs < 0.01 {
        8
    } else if abs < 1.0 {
        6
    } else if abs < 1000.0 {
        2
    } else {
        0
    };
    format!("{:.*}", decimals, quantity)
}

/// Holding value: 4 dp below 1, 2 dp below 1000, else whole units grouped.
pub fn format_value(value: f64, sign: &str) -> String {
    let abs = value.abs();
    let decimals = if abs < 1.0 {
        4
    } else if abs < 1000.0 {
        2
    } else {
        0
    };
    money(sign, value, decimals)
}

/// Portfolio total: always 2 dp, grouped.
pub fn format_total(value: f64, sign: &str) -> String {
    money(sign, value, 2)
}

/// Market unit price: 4 dp below 1, otherwise 2 dp grouped.
pub fn format_price(price: f64, sign: &str) -> String {
    let decimals = if price.abs() < 1.0 { 4 } else { 2 };
    money(sign, price, decimals)
}

/// Signed percentage with 2 dp, e.g. `+2.50%`.
pub fn format_change(change: f64) -> String {
    let rendered = format!("{:.2}", change.abs());
    if change < 0.0 && rendered != "0.00" {
        format!("-{}%", rendered)
    } else {
        format!("+{}%", rendered)
    }
}

/// Polarity marker shown next to any 24h change.
pub fn change_indicator(change: f64) -> &'static str {
    if change >= 0.0 {
        "🟢"
    } else {
        "🔴"
    }
}
