//! Record id checks for lookup fields.

/// 15-character case-sensitive or 18-character case-insensitive id.
pub fn is_record_id(value: &str) -> bool {
    matches!(value.len(), 15 | 18) && value.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_shapes() {
        assert!(is_record_id("001000000000001"));
        assert!(is_record_id("001000000000001AAA"));
        assert!(!is_record_id("00100000000001"));
        assert!(!is_record_id("001000000000001AA"));
        assert!(!is_record_id("001-00000000001"));
        assert!(!is_record_id("Acme Corporation"));
    }
}
