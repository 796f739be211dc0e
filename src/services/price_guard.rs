use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::services::catalog_service::CatalogSnapshot;
use crate::services::pricing_service::{PriceCalculator, PriceResult, PricingError, Selection};

#[derive(Debug, Clone, PartialEq)]
pub enum PriceGuardError {
    /// The client-asserted total disagrees with a fresh server calculation
    /// beyond the configured tolerance
    Mismatch { expected: Decimal, asserted: Decimal },
    Pricing(PricingError),
}

impl std::fmt::Display for PriceGuardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceGuardError::Mismatch { expected, asserted } => write!(
                f,
                "Asserted price {} does not match the current price {}",
                asserted, expected
            ),
            PriceGuardError::Pricing(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for PriceGuardError {}

impl From<PricingError> for PriceGuardError {
    fn from(err: PricingError) -> Self {
        PriceGuardError::Pricing(err)
    }
}

/// Last line of defense before payment capture: never trust a total the
/// client sends back, recompute it against whatever the catalog and rules
/// say right now.
pub struct PriceGuard {
    pub calculator: PriceCalculator,
}

impl PriceGuard {
    pub fn new(calculator: PriceCalculator) -> Self {
        Self { calculator }
    }

    /// Recompute the selection's price and compare with the asserted total.
    /// Side-effect free, so the workflow can call it at checkout display and
    /// again when the payment intent is created.
    ///
    /// Returns the fresh result on success so the caller can persist it as
    /// the booking's frozen snapshot.
    pub fn validate(
        &self,
        snapshot: &CatalogSnapshot,
        selection: &Selection,
        asserted_total: Decimal,
        at: DateTime<Utc>,
    ) -> Result<PriceResult, PriceGuardError> {
        let result = self.calculator.calculate(snapshot, selection, at)?;
        let difference = (result.total - asserted_total).abs();
        if difference > self.calculator.config.validation_tolerance {
            return Err(PriceGuardError::Mismatch {
                expected: result.total,
                asserted: asserted_total,
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::{Experience, HotelTier, Package, TransportOption};
    use crate::services::pricing_service::PricingConfig;
    use bson::oid::ObjectId;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn eval_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn snapshot() -> (CatalogSnapshot, Selection) {
        let experience = Experience {
            id: Some(ObjectId::new()),
            name: "Backwater Cruise".to_string(),
            description: "Half day on the lake".to_string(),
            city: "Alleppey".to_string(),
            base_price: dec!(1200),
            duration_hours: Some(4),
            active: true,
            created_at: None,
            updated_at: None,
        };
        let tier = HotelTier {
            id: Some(ObjectId::new()),
            name: "Standard".to_string(),
            price_multiplier: dec!(1.2),
            active: true,
            created_at: None,
            updated_at: None,
        };
        let cab = TransportOption {
            id: Some(ObjectId::new()),
            name: "Airport Cab".to_string(),
            mode: "cab".to_string(),
            base_price: dec!(600),
            active: true,
            created_at: None,
            updated_at: None,
        };

        let package_id = ObjectId::new();
        let package = Package {
            id: Some(package_id),
            slug: "alleppey-weekend".to_string(),
            name: "Alleppey Weekend".to_string(),
            city: "Alleppey".to_string(),
            description: "Backwaters and beaches".to_string(),
            experience_ids: vec![experience.id.unwrap()],
            hotel_tier_ids: vec![tier.id.unwrap()],
            transport_option_ids: vec![cab.id.unwrap()],
            active: true,
            created_at: None,
            updated_at: None,
        };

        let selection = Selection {
            experience_ids: vec![experience.id.unwrap()],
            hotel_tier_id: tier.id.unwrap(),
            transport_option_id: cab.id.unwrap(),
        };

        let mut experiences = HashMap::new();
        experiences.insert(experience.id.unwrap(), experience);
        let mut hotel_tiers = HashMap::new();
        hotel_tiers.insert(tier.id.unwrap(), tier);
        let mut transport_options = HashMap::new();
        transport_options.insert(cab.id.unwrap(), cab);

        (
            CatalogSnapshot {
                package_id,
                package,
                experiences,
                hotel_tiers,
                transport_options,
                rules: Vec::new(),
            },
            selection,
        )
    }

    fn guard() -> PriceGuard {
        PriceGuard::new(PriceCalculator::with_config(PricingConfig::default()))
    }

    #[test]
    fn test_validating_a_fresh_quote_passes() {
        let (snapshot, selection) = snapshot();
        let guard = guard();

        let quoted = guard
            .calculator
            .calculate(&snapshot, &selection, eval_time())
            .unwrap();
        let checked = guard
            .validate(&snapshot, &selection, quoted.total, eval_time())
            .unwrap();

        assert_eq!(checked, quoted);
    }

    #[test]
    fn test_guard_is_reentrant() {
        let (snapshot, selection) = snapshot();
        let guard = guard();
        let quoted = guard
            .calculator
            .calculate(&snapshot, &selection, eval_time())
            .unwrap();

        // Checkout display, then payment intent creation
        assert!(guard
            .validate(&snapshot, &selection, quoted.total, eval_time())
            .is_ok());
        assert!(guard
            .validate(&snapshot, &selection, quoted.total, eval_time())
            .is_ok());
    }

    #[test]
    fn test_one_minor_unit_gap_is_absorbed() {
        let (snapshot, selection) = snapshot();
        let guard = guard();
        let quoted = guard
            .calculator
            .calculate(&snapshot, &selection, eval_time())
            .unwrap();

        assert!(guard
            .validate(
                &snapshot,
                &selection,
                quoted.total + dec!(0.01),
                eval_time()
            )
            .is_ok());
    }

    #[test]
    fn test_tampered_price_is_rejected() {
        let (snapshot, selection) = snapshot();
        let guard = guard();
        let quoted = guard
            .calculator
            .calculate(&snapshot, &selection, eval_time())
            .unwrap();

        let err = guard
            .validate(&snapshot, &selection, quoted.total - dec!(500), eval_time())
            .unwrap_err();

        assert_eq!(
            err,
            PriceGuardError::Mismatch {
                expected: quoted.total,
                asserted: quoted.total - dec!(500),
            }
        );
    }

    #[test]
    fn test_calculator_errors_pass_through() {
        let (snapshot, selection) = snapshot();
        let guard = guard();
        let tampered = Selection {
            experience_ids: vec![ObjectId::new()],
            ..selection
        };

        let err = guard
            .validate(&snapshot, &tampered, dec!(1000), eval_time())
            .unwrap_err();

        assert!(matches!(err, PriceGuardError::Pricing(_)));
    }
}
