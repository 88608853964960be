//! # Invoice Number Arithmetic
//!
//! Pure helpers for the per-store invoice sequence.
//!
//! An invoice number is a fixed alphanumeric prefix followed by a
//! zero-padded decimal suffix, e.g. `INV00042`. Advancing the sequence
//! increments the suffix by one while preserving its width; the width
//! grows only when the suffix overflows it (`INV99` → `INV100`).

use crate::error::{CoreError, CoreResult};

/// Splits an invoice number into (prefix, numeric suffix).
///
/// The suffix is the longest run of trailing ASCII digits. A value with
/// no trailing digits is rejected: the sequencer cannot advance it.
fn split_suffix(invoice: &str) -> CoreResult<(&str, &str)> {
    let digits_start = invoice
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + invoice[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);

    let suffix = &invoice[digits_start..];
    if suffix.is_empty() {
        return Err(CoreError::BadInvoiceFormat(invoice.to_string()));
    }
    Ok((&invoice[..digits_start], suffix))
}

/// Returns the invoice number following `last`.
///
/// ## Example
/// ```rust
/// use pharma_core::invoice::next_invoice_number;
///
/// assert_eq!(next_invoice_number("INV00042").unwrap(), "INV00043");
/// assert_eq!(next_invoice_number("INV99").unwrap(), "INV100");
/// ```
///
/// ## Errors
/// [`CoreError::BadInvoiceFormat`] when `last` has no numeric suffix,
/// the suffix does not fit a u64, or the sequence is exhausted.
pub fn next_invoice_number(last: &str) -> CoreResult<String> {
    let (prefix, suffix) = split_suffix(last)?;

    let value: u64 = suffix
        .parse()
        .map_err(|_| CoreError::BadInvoiceFormat(last.to_string()))?;
    let next = value
        .checked_add(1)
        .ok_or_else(|| CoreError::BadInvoiceFormat(last.to_string()))?;

    Ok(format!("{}{:0width$}", prefix, next, width = suffix.len()))
}
