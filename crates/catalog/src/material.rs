use chrono::{DateTime, Utc};

use oficina_core::{DomainError, DomainResult, Entity, MaterialId};

/// Upper bound on catalog material names (storage column width).
pub const MAX_NAME_LEN: usize = 200;

/// Entity: a catalog material with a unit price.
///
/// Invariants enforced at construction and on every full replace:
/// - `name` is trimmed, non-empty and at most [`MAX_NAME_LEN`] characters;
/// - `unit_price` is finite and strictly positive.
///
/// Name **uniqueness** spans the whole catalog and is enforced by the store
/// (unique index / pre-insert lookup), not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    id: MaterialId,
    name: String,
    unit_price: f64,
    created_at: DateTime<Utc>,
}

impl Material {
    /// Create a new catalog material, validating name and price.
    pub fn new(
        id: MaterialId,
        name: impl Into<String>,
        unit_price: f64,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = validate_name(name.into())?;
        validate_unit_price(unit_price)?;
        Ok(Self {
            id,
            name,
            unit_price,
            created_at,
        })
    }

    /// Rehydrate from storage. Rows were validated on the way in.
    pub fn from_stored(
        id: MaterialId,
        name: String,
        unit_price: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            unit_price,
            created_at,
        }
    }

    /// Full replace of the mutable fields (update semantics), re-running the
    /// same validation as creation.
    pub fn replace(&mut self, name: impl Into<String>, unit_price: f64) -> DomainResult<()> {
        let name = validate_name(name.into())?;
        validate_unit_price(unit_price)?;
        self.name = name;
        self.unit_price = unit_price;
        Ok(())
    }

    pub fn id_typed(&self) -> MaterialId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for Material {
    type Id = MaterialId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_name(name: String) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_input("material name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::invalid_input(format!(
            "material name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_unit_price(unit_price: f64) -> DomainResult<()> {
    if !unit_price.is_finite() || unit_price <= 0.0 {
        return Err(DomainError::invalid_input(
            "unit price must be a positive number",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_id() -> MaterialId {
        MaterialId::new()
    }

    #[test]
    fn new_material_keeps_trimmed_name_and_price() {
        let m = Material::new(test_id(), "  Cimento ", 50.0, Utc::now()).unwrap();
        assert_eq!(m.name(), "Cimento");
        assert_eq!(m.unit_price(), 50.0);
    }

    #[test]
    fn new_material_rejects_empty_name() {
        let err = Material::new(test_id(), "   ", 50.0, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn new_material_rejects_overlong_name() {
        let name = "x".repeat(MAX_NAME_LEN + 1);
        let err = Material::new(test_id(), name, 50.0, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn new_material_rejects_non_positive_price() {
        for price in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let err = Material::new(test_id(), "Cimento", price, Utc::now()).unwrap_err();
            assert!(matches!(err, DomainError::InvalidInput(_)), "price {price}");
        }
    }

    #[test]
    fn replace_applies_both_fields_or_neither() {
        let mut m = Material::new(test_id(), "Cimento", 50.0, Utc::now()).unwrap();

        m.replace("Cimento CP-II", 55.5).unwrap();
        assert_eq!(m.name(), "Cimento CP-II");
        assert_eq!(m.unit_price(), 55.5);

        let err = m.replace("", 60.0).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        // Failed replace leaves the entity untouched.
        assert_eq!(m.name(), "Cimento CP-II");
        assert_eq!(m.unit_price(), 55.5);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any non-blank bounded name with a positive finite
            /// price constructs, and the stored values round-trip.
            #[test]
            fn valid_inputs_always_construct(
                name in "[A-Za-zÀ-ú][A-Za-zÀ-ú0-9 ]{0,99}",
                price in 0.01f64..1_000_000.0
            ) {
                let m = Material::new(MaterialId::new(), name.clone(), price, Utc::now()).unwrap();
                prop_assert_eq!(m.name(), name.trim());
                prop_assert_eq!(m.unit_price(), price);
            }

            /// Property: non-positive prices never construct.
            #[test]
            fn non_positive_prices_never_construct(price in -1_000_000.0f64..=0.0) {
                let err = Material::new(MaterialId::new(), "Areia", price, Utc::now()).unwrap_err();
                prop_assert!(matches!(err, DomainError::InvalidInput(_)));
            }
        }
    }
}
