//! CSV header normalization.

/// Normalizes a header cell: trims, drops a stray byte-order mark and
/// collapses inner whitespace runs to one space.
pub fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  First   Name "), "First Name");
        assert_eq!(normalize_header("\u{feff}Email"), "Email");
        assert_eq!(normalize_header("Amt\t(USD)"), "Amt (USD)");
        assert_eq!(normalize_header("   "), "");
    }
}
