use crate::aggregate::ColumnError;

/// Marker shown in place of a total that could not be computed.
pub const ERROR_MARKER: &str = "エラー";

fn group_thousands(int_part: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format an amount with two decimals and thousands separators: 1,234.56
pub fn amount(val: f64) -> String {
    let negative = val < 0.0;
    let fixed = format!("{:.2}", val.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let body = format!("{}.{dec_part}", group_thousands(int_part));
    if negative && fixed != "0.00" {
        format!("-{body}")
    } else {
        body
    }
}

/// Format a conversion count; whole numbers drop the decimals.
pub fn count(val: f64) -> String {
    if val.fract() == 0.0 {
        let sign = if val < 0.0 { "-" } else { "" };
        format!("{sign}{}", group_thousands(&format!("{:.0}", val.abs())))
    } else {
        amount(val)
    }
}

pub fn total(value: &Result<f64, ColumnError>) -> String {
    match value {
        Ok(v) => amount(*v),
        Err(_) => ERROR_MARKER.to_string(),
    }
}
