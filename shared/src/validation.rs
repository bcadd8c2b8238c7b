//! Validation utilities shared by the backend services

use rust_decimal::Decimal;

use crate::codes::normalize_serial;

/// Validate and normalize a list of serial numbers: trims, adds the
/// `LEH-` prefix where missing, rejects blanks and duplicates within
/// the list. Global uniqueness against the store is checked separately.
pub fn normalize_serial_list(serials: &[String]) -> Result<Vec<String>, String> {
    if serials.is_empty() {
        return Err("At least one serial number is required".to_string());
    }

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(serials.len());
    for serial in serials {
        let normalized = normalize_serial(serial);
        if normalized.is_empty() {
            return Err("Serial number cannot be blank".to_string());
        }
        if !seen.insert(normalized.to_uppercase()) {
            return Err(format!("Duplicate serial number: {}", normalized));
        }
        out.push(normalized);
    }
    Ok(out)
}

/// Validate that a quantity is strictly positive.
pub fn validate_positive_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than 0");
    }
    Ok(())
}

/// Validate that a monetary amount is strictly positive.
pub fn validate_positive_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_list_normalizes_and_rejects_duplicates() {
        let ok = normalize_serial_list(&["2201".into(), "LEH-2202".into()]).unwrap();
        assert_eq!(ok, vec!["LEH-2201".to_string(), "LEH-2202".to_string()]);

        // duplicate after normalization, case-insensitive
        let err = normalize_serial_list(&["2201".into(), "leh-2201".into()]);
        assert!(err.is_err());
    }

    #[test]
    fn serial_list_rejects_blank_and_empty() {
        assert!(normalize_serial_list(&[]).is_err());
        assert!(normalize_serial_list(&["  ".into()]).is_err());
    }
}
