//! Prefixed code generation and serial-number normalization
//!
//! Every entity carries a short human-readable id such as `PINV-QKZJWXAB`
//! or `PROD-KQZXM`. Uniqueness is verified against the store by the
//! backend before insertion.

use rand::Rng;

/// Prefix prepended to serial numbers when the caller omits it.
pub const SERIAL_PREFIX: &str = "LEH-";

/// Id prefixes used across the system.
pub const ITEM_PREFIX: &str = "ITM";
pub const PURCHASE_INVOICE_PREFIX: &str = "PINV";
pub const PAYMENT_PREFIX: &str = "PAY";
pub const DIRECT_PAYMENT_PREFIX: &str = "DPAY";
pub const PRODUCTION_BATCH_PREFIX: &str = "PROD";
pub const RECIPE_PREFIX: &str = "RCP";
pub const STOCK_PREFIX: &str = "STK";
pub const ACCOUNT_PREFIX: &str = "ACC";

/// Generate a prefixed code: `{prefix}-{random uppercase letters}`.
pub fn generate_code(prefix: &str, length: usize) -> String {
    let mut rng = rand::thread_rng();
    let random_part: String = (0..length)
        .map(|_| rng.gen_range(b'A'..=b'Z') as char)
        .collect();
    format!("{}-{}", prefix, random_part)
}

/// Add the `LEH-` prefix if the serial was given without it
/// (e.g. `2201` -> `LEH-2201`). The existing-prefix check is
/// case-insensitive; an already-prefixed serial passes through unchanged.
pub fn normalize_serial(serial: &str) -> String {
    let trimmed = serial.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.to_uppercase().starts_with(SERIAL_PREFIX) {
        return trimmed.to_string();
    }
    format!("{}{}", SERIAL_PREFIX, trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_has_prefix_and_length() {
        let code = generate_code(PURCHASE_INVOICE_PREFIX, 8);
        assert!(code.starts_with("PINV-"));
        assert_eq!(code.len(), "PINV-".len() + 8);
        assert!(code["PINV-".len()..]
            .chars()
            .all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn serial_prefix_added_when_missing() {
        assert_eq!(normalize_serial("2201"), "LEH-2201");
        assert_eq!(normalize_serial("  2201  "), "LEH-2201");
    }

    #[test]
    fn serial_prefix_not_doubled() {
        assert_eq!(normalize_serial("LEH-2201"), "LEH-2201");
        // case-insensitive prefix check keeps the original spelling
        assert_eq!(normalize_serial("leh-2201"), "leh-2201");
    }

    #[test]
    fn blank_serial_normalizes_to_empty() {
        assert_eq!(normalize_serial("   "), "");
    }
}
