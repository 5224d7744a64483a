/// Strips everything but ASCII letters and digits.
///
/// This is the single deduplication key for invoices, RIPS lines and
/// cancellations, so `"FAC-001"`, `" FAC 001 "` and `"FAC001"` collide.
pub fn normalize_invoice_number(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Facility names match exactly after trimming and uppercasing.
pub fn facility_key(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Insurer names match loosely: uppercase with whitespace runs collapsed.
pub fn insurer_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_number_variants_collide() {
        assert_eq!(normalize_invoice_number("FAC-001"), "FAC001");
        assert_eq!(normalize_invoice_number("FAC001"), "FAC001");
        assert_eq!(normalize_invoice_number("  FAC 001 "), "FAC001");
        assert_eq!(normalize_invoice_number("fac/001."), "fac001");
    }

    #[test]
    fn test_invoice_number_drops_non_ascii() {
        assert_eq!(normalize_invoice_number("Nº-12"), "N12");
        assert_eq!(normalize_invoice_number("---"), "");
    }

    #[test]
    fn test_facility_key() {
        assert_eq!(facility_key("  Sede Norte "), "SEDE NORTE");
        assert_ne!(facility_key("Sede  Norte"), facility_key("Sede Norte"));
    }

    #[test]
    fn test_insurer_key_collapses_whitespace() {
        assert_eq!(insurer_key(" nueva   eps  s.a. "), "NUEVA EPS S.A.");
    }
}
