//! Validation rules shared by the engine entry points

use uuid::Uuid;

/// Longest accepted client-supplied idempotency key
pub const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 128;

/// Order line quantities must be strictly positive.
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Required free-text fields must contain something once trimmed.
pub fn validate_required_text(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("Value must not be empty");
    }
    Ok(())
}

/// Trim optional free text; whitespace-only input collapses to `None`.
pub fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// A purchase order needs a supplier: either a reference to a registered
/// supplier or a non-empty free-text name.
pub fn validate_supplier_reference(
    supplier_id: Option<Uuid>,
    supplier_name: Option<&str>,
) -> Result<(), &'static str> {
    if supplier_id.is_some() {
        return Ok(());
    }
    match supplier_name {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err("Either a supplier reference or a supplier name is required"),
    }
}

/// Normalize a client-supplied idempotency key: trimmed, empty collapses to
/// `None`, oversized keys are rejected.
pub fn normalize_idempotency_key(value: Option<&str>) -> Result<Option<String>, &'static str> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > MAX_IDEMPOTENCY_KEY_LENGTH {
        return Err("Idempotency key must be 128 characters or less");
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }

    #[test]
    fn optional_text_normalization() {
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(normalize_optional_text(Some("  ".to_string())), None);
        assert_eq!(
            normalize_optional_text(Some("  note ".to_string())),
            Some("note".to_string())
        );
    }

    #[test]
    fn supplier_reference_rule() {
        assert!(validate_supplier_reference(Some(Uuid::new_v4()), None).is_ok());
        assert!(validate_supplier_reference(None, Some("Acme Beans")).is_ok());
        assert!(validate_supplier_reference(None, Some("   ")).is_err());
        assert!(validate_supplier_reference(None, None).is_err());
    }

    #[test]
    fn idempotency_key_normalization() {
        assert_eq!(normalize_idempotency_key(None), Ok(None));
        assert_eq!(normalize_idempotency_key(Some("  ")), Ok(None));
        assert_eq!(
            normalize_idempotency_key(Some(" retry-1 ")),
            Ok(Some("retry-1".to_string()))
        );
        let oversized = "k".repeat(MAX_IDEMPOTENCY_KEY_LENGTH + 1);
        assert!(normalize_idempotency_key(Some(&oversized)).is_err());
    }
}
