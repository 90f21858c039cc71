//! Argument validation for string-typed operation inputs.
//!
//! Every operation receives its arguments as strings, the way a dispatch
//! layer hands them over. These helpers turn them into checked values
//! before any store access happens.

use crate::error::{LedgerError, LedgerResult};

/// Parse a material quantity: a non-negative base-10 integer.
///
/// Surrounding whitespace, signs, and fractional parts are rejected.
///
/// ```
/// use studio_ledger::validation::parse_quantity;
///
/// assert_eq!(parse_quantity("40").unwrap(), 40);
/// assert!(parse_quantity("-1").is_err());
/// assert!(parse_quantity("4.5").is_err());
/// ```
pub fn parse_quantity(raw: &str) -> LedgerResult<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::InvalidArgument(format!(
            "quantity must be a non-negative integer, got {raw:?}"
        )));
    }
    raw.parse::<u64>().map_err(|e| {
        LedgerError::InvalidArgument(format!("quantity {raw:?} is out of range: {e}"))
    })
}

/// Validate an owner identifier.
pub fn validate_owner_id(id: &str) -> LedgerResult<()> {
    if id.is_empty() {
        return Err(LedgerError::InvalidArgument(
            "owner id must not be empty".into(),
        ));
    }
    Ok(())
}

/// Validate a material description.
pub fn validate_description(description: &str) -> LedgerResult<()> {
    if description.is_empty() {
        return Err(LedgerError::InvalidArgument(
            "material description must not be empty".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn accepts_plain_integers() {
        assert_eq!(parse_quantity("0").unwrap(), 0);
        assert_eq!(parse_quantity("007").unwrap(), 7);
        assert_eq!(parse_quantity("18446744073709551615").unwrap(), u64::MAX);
    }

    #[test]
    fn rejects_everything_else() {
        for raw in ["", " 1", "1 ", "+1", "-1", "1.0", "1e3", "dez", "0x10"] {
            let err = parse_quantity(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "input {raw:?}");
        }
    }

    #[test]
    fn rejects_overflow() {
        let err = parse_quantity("18446744073709551616").unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn empty_ids_and_descriptions_are_invalid() {
        assert!(validate_owner_id("").is_err());
        assert!(validate_owner_id("Ezequiel").is_ok());
        assert!(validate_description("").is_err());
        assert!(validate_description("Sangue de Dragão").is_ok());
    }
}
