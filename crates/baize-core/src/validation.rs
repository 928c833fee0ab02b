//! # Validation Module
//!
//! Input validation for operator-entered values, run at the command layer
//! before business logic. The store enforces no schema and the dashboard
//! can drift, so the rules live here rather than only in the UI.
//!
//! ## Usage
//! ```rust
//! use baize_core::validation::{validate_player_name, validate_table_number};
//!
//! assert!(validate_player_name("Bat").is_ok());
//! assert!(validate_table_number(3, 8).is_ok());
//! assert!(validate_table_number(9, 8).is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a player name (the session's natural key).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 60 characters
///
/// ## Returns
/// The trimmed name.
pub fn validate_player_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "player name".to_string(),
        });
    }

    if name.chars().count() > 60 {
        return Err(ValidationError::TooLong {
            field: "player name".to_string(),
            max: 60,
        });
    }

    Ok(name.to_string())
}

/// Validates a market item name.
pub fn validate_item_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "item name".to_string(),
        });
    }

    if name.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "item name".to_string(),
            max: 100,
        });
    }

    Ok(name.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a table number against the hall's configured table count.
///
/// Table 0 is the untracked sentinel and is not a playable choice.
pub fn validate_table_number(table: u32, table_count: u32) -> ValidationResult<()> {
    if table == 0 || table > table_count {
        return Err(ValidationError::OutOfRange {
            field: "table".to_string(),
            min: 1,
            max: table_count as i64,
        });
    }

    Ok(())
}

/// Validates an operator-entered payment amount in whole units.
///
/// ## Rules
/// - Must be non-negative; zero is allowed (a comped checkout records a
///   zero collection, the mismatch warning does the rest)
pub fn validate_paid_amount(units: i64) -> ValidationResult<()> {
    if units < 0 {
        return Err(ValidationError::OutOfRange {
            field: "paid amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a partial-settlement amount in whole units.
///
/// ## Rules
/// - Must be strictly positive; the settlement engine re-checks this, the
///   command layer rejects it first with a field-level message
pub fn validate_settlement_amount(units: i64) -> ValidationResult<()> {
    if units <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "settlement amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a per-game price in whole units.
pub fn validate_price_units(units: i64) -> ValidationResult<()> {
    if units < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a session/transaction id.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_name() {
        assert_eq!(validate_player_name("  Bat ").unwrap(), "Bat");
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("   ").is_err());
        assert!(validate_player_name(&"x".repeat(61)).is_err());
    }

    #[test]
    fn test_validate_table_number() {
        assert!(validate_table_number(1, 8).is_ok());
        assert!(validate_table_number(8, 8).is_ok());
        assert!(validate_table_number(0, 8).is_err());
        assert!(validate_table_number(9, 8).is_err());
    }

    #[test]
    fn test_validate_paid_amount() {
        assert!(validate_paid_amount(0).is_ok());
        assert!(validate_paid_amount(5500).is_ok());
        assert!(validate_paid_amount(-1).is_err());
    }

    #[test]
    fn test_validate_settlement_amount() {
        assert!(validate_settlement_amount(600).is_ok());
        assert!(validate_settlement_amount(0).is_err());
        assert!(validate_settlement_amount(-100).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
