use chrono::{Local, NaiveDate, Utc};
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn today_iso() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Display rounding only. Never feed the result back into stored amounts.
pub fn format_decimal(value: f64) -> String {
    format!("{:.2}", value)
}

/// Accepts `.` or a single `,` as the decimal separator. Input that could be
/// read as a thousands separator (`1,250`, `1.000,50`) is refused.
pub fn parse_decimal(value: &str) -> AppResult<f64> {
    let raw = value.trim();
    let normalized = match raw.split_once(',') {
        None => raw.to_string(),
        Some((whole, fraction)) => {
            if whole.contains('.') || fraction.contains([',', '.']) || fraction.len() == 3 {
                return Err(AppError::validation(format!("Ambiguous decimal '{}'", value)));
            }
            format!("{}.{}", whole, fraction)
        }
    };
    let parsed = normalized
        .parse::<f64>()
        .map_err(|e| AppError::validation(format!("Parse decimal '{}': {}", value, e)))?;
    if !parsed.is_finite() {
        return Err(AppError::validation(format!("Not a finite number: '{}'", value)));
    }
    Ok(parsed)
}

pub fn parse_quantity(value: &str) -> AppResult<u32> {
    let quantity = value
        .trim()
        .parse::<u32>()
        .map_err(|e| AppError::validation(format!("Parse quantity '{}': {}", value, e)))?;
    if quantity < 1 {
        return Err(AppError::validation("Quantity must be at least 1"));
    }
    Ok(quantity)
}

pub fn normalize_date(value: &str) -> AppResult<String> {
    let raw = value.trim();
    let formats = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d", "%Y.%m.%d"];
    for fmt in formats.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(date.format("%Y-%m-%d").to_string());
        }
    }
    Err(AppError::validation(format!("Unrecognized date '{}'", value)))
}
