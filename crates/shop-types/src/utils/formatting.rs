//! String formatting utilities.
//!
//! Provides the human-facing forms of order numbers and money amounts, and
//! truncation of secrets and long identifiers for logs.

/// Truncates an identifier for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

/// Formats a numeric order id as its zero-padded display number.
pub fn format_order_number(id: u64, width: usize) -> String {
	format!("{:0width$}", id, width = width)
}

/// Formats an amount in minor units for display.
///
/// `minor_units` is the number of minor units per major unit (1000 for KWD,
/// 100 for most other currencies).
///
/// # Returns
///
/// A string like "10.000 KWD" or "12.50 USD".
pub fn format_amount(amount: i64, minor_units: u32, currency: &str) -> String {
	let sign = if amount < 0 { "-" } else { "" };
	let abs = amount.unsigned_abs();
	if minor_units <= 1 {
		return format!("{}{} {}", sign, abs, currency);
	}

	let per_major = u64::from(minor_units);
	let mut places = 0;
	let mut scale = 1u64;
	while scale < per_major {
		scale *= 10;
		places += 1;
	}
	format!(
		"{}{}.{:0places$} {}",
		sign,
		abs / per_major,
		abs % per_major,
		currency,
		places = places
	)
}
