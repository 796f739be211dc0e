use std::collections::HashSet;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::models::pricing_rule::{PricingRule, RuleKind};
use crate::services::catalog_service::CatalogSnapshot;

#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// ISO currency code stamped on every result
    pub currency: String,
    /// Upper bound on experiences per booking
    pub max_experiences: usize,
    /// Totals never drop below this after discounts
    pub price_floor: Decimal,
    /// Allowed gap between an asserted and a recomputed total
    pub validation_tolerance: Decimal,
    /// How long a fetched rule set may be served from cache
    pub rule_cache_ttl_seconds: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            max_experiences: 10,
            price_floor: Decimal::ZERO,
            validation_tolerance: Decimal::new(1, 2),
            rule_cache_ttl_seconds: 300,
        }
    }
}

impl PricingConfig {
    /// Create config from environment variables or use defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            currency: std::env::var("PRICING_CURRENCY").unwrap_or(defaults.currency),
            max_experiences: std::env::var("PRICING_MAX_EXPERIENCES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_experiences),
            price_floor: std::env::var("PRICING_PRICE_FLOOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.price_floor),
            validation_tolerance: std::env::var("PRICING_TOLERANCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.validation_tolerance),
            rule_cache_ttl_seconds: std::env::var("PRICING_RULE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rule_cache_ttl_seconds),
        }
    }
}

/// The components a traveler picked for one booking. Hotel tier and
/// transport are mandatory, so they are not optional here; absent fields
/// are rejected at the edge before a Selection is ever built.
#[derive(Debug, Clone)]
pub struct Selection {
    pub experience_ids: Vec<ObjectId>,
    pub hotel_tier_id: ObjectId,
    pub transport_option_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PricingError {
    InvalidSelection(String),
    MissingRequiredComponent(&'static str),
    ComponentNotFound {
        kind: &'static str,
        id: Option<ObjectId>,
    },
    ComponentNotInPackage {
        kind: &'static str,
        id: ObjectId,
    },
}

impl PricingError {
    /// Stable machine-readable code for API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            PricingError::InvalidSelection(_) => "invalid_selection",
            PricingError::MissingRequiredComponent(_) => "missing_required_component",
            PricingError::ComponentNotFound { .. } => "component_not_found",
            PricingError::ComponentNotInPackage { .. } => "component_not_in_package",
        }
    }
}

impl std::fmt::Display for PricingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingError::InvalidSelection(reason) => write!(f, "Invalid selection: {}", reason),
            PricingError::MissingRequiredComponent(field) => {
                write!(f, "Required field '{}' is missing", field)
            }
            PricingError::ComponentNotFound { kind, id } => match id {
                Some(id) => write!(f, "{} {} does not exist or is inactive", kind, id),
                None => write!(f, "package has no active {} to price", kind),
            },
            PricingError::ComponentNotInPackage { kind, id } => {
                write!(f, "{} {} is not part of this package", kind, id)
            }
        }
    }
}

impl std::error::Error for PricingError {}

/// One line of the itemized quote, in the order it was priced.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum BreakdownItem {
    #[serde(rename = "experience")]
    Experience {
        id: ObjectId,
        name: String,
        amount: Decimal,
    },

    #[serde(rename = "transport")]
    Transport {
        id: ObjectId,
        name: String,
        amount: Decimal,
    },

    #[serde(rename = "hotel_tier")]
    HotelTier {
        id: ObjectId,
        name: String,
        multiplier: Decimal,
        running_total: Decimal,
    },

    #[serde(rename = "rule")]
    Rule {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<ObjectId>,
        name: String,
        kind: RuleKind,
        delta: Decimal,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PriceResult {
    pub total: Decimal,
    pub currency: String,
    /// True when the rule chain drove the total below the floor
    pub clamped: bool,
    pub breakdown: Vec<BreakdownItem>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PriceRange {
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub currency: String,
}

pub struct PriceCalculator {
    pub config: PricingConfig,
}

impl PriceCalculator {
    pub fn new() -> Self {
        Self {
            config: PricingConfig::from_env(),
        }
    }

    pub fn with_config(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Price one selection against a catalog snapshot.
    ///
    /// Pure over its inputs: the same snapshot, selection and instant always
    /// produce the same result, which is what lets the validation guard
    /// recompute instead of trusting the client. Reads only; the caller owns
    /// persistence.
    pub fn calculate(
        &self,
        snapshot: &CatalogSnapshot,
        selection: &Selection,
        at: DateTime<Utc>,
    ) -> Result<PriceResult, PricingError> {
        self.check_selection(snapshot, selection)?;

        let mut breakdown = Vec::with_capacity(selection.experience_ids.len() + 3);
        let mut running = Decimal::ZERO;

        // Experiences first, listed in the order the caller sent them
        for id in &selection.experience_ids {
            let experience = snapshot
                .experiences
                .get(id)
                .ok_or(PricingError::ComponentNotFound {
                    kind: "experience",
                    id: Some(*id),
                })?;
            let amount = to_minor_units(experience.base_price);
            running += amount;
            breakdown.push(BreakdownItem::Experience {
                id: *id,
                name: experience.name.clone(),
                amount,
            });
        }

        // Transport is priced once per booking, not per traveler
        let transport = snapshot
            .transport_options
            .get(&selection.transport_option_id)
            .ok_or(PricingError::ComponentNotFound {
                kind: "transport_option",
                id: Some(selection.transport_option_id),
            })?;
        let transport_amount = to_minor_units(transport.base_price);
        running += transport_amount;
        breakdown.push(BreakdownItem::Transport {
            id: selection.transport_option_id,
            name: transport.name.clone(),
            amount: transport_amount,
        });

        // The tier multiplier scales everything priced so far, not just a
        // hotel line item
        let tier = snapshot
            .hotel_tiers
            .get(&selection.hotel_tier_id)
            .ok_or(PricingError::ComponentNotFound {
                kind: "hotel_tier",
                id: Some(selection.hotel_tier_id),
            })?;
        running = to_minor_units(running * tier.price_multiplier);
        breakdown.push(BreakdownItem::HotelTier {
            id: selection.hotel_tier_id,
            name: tier.name.clone(),
            multiplier: tier.price_multiplier,
            running_total: running,
        });

        // Rule order is load-bearing: a percentage rule multiplies whatever
        // total the previous rule left behind, so the chain must replay in
        // the same sequence every time
        let mut rules: Vec<&PricingRule> = snapshot
            .rules
            .iter()
            .filter(|rule| rule.applies_at(at, &snapshot.package_id))
            .collect();
        rules.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.id.cmp(&b.id)));

        for rule in rules {
            let delta = match rule.kind {
                RuleKind::PercentMarkup | RuleKind::PercentDiscount => {
                    to_minor_units(running * rule.value / Decimal::ONE_HUNDRED)
                }
                RuleKind::FixedMarkup | RuleKind::FixedDiscount => to_minor_units(rule.value),
            };
            let signed = if rule.kind.is_markup() { delta } else { -delta };
            running += signed;
            breakdown.push(BreakdownItem::Rule {
                id: rule.id,
                name: rule.name.clone(),
                kind: rule.kind,
                delta: signed,
            });
        }

        let mut clamped = false;
        let total = if running < self.config.price_floor {
            clamped = true;
            log::warn!(
                "price for package {} clamped to {} (rule chain produced {})",
                snapshot.package_id,
                self.config.price_floor,
                running
            );
            self.config.price_floor
        } else {
            running
        };

        Ok(PriceResult {
            total,
            currency: self.config.currency.clone(),
            clamped,
            breakdown,
        })
    }

    /// Cheapest-to-priciest bounds for "packages from ₹X" display.
    ///
    /// Two real calculations: the single cheapest combination, and every
    /// eligible experience with the priciest tier and transport. The upper
    /// bound is only tight while rule deltas grow with the subtotal; a large
    /// fixed discount can make it loose, which is accepted for a teaser
    /// figure.
    pub fn estimate_range(
        &self,
        snapshot: &CatalogSnapshot,
        at: DateTime<Utc>,
    ) -> Result<PriceRange, PricingError> {
        let cheapest_experience = snapshot
            .experiences
            .iter()
            .min_by(|a, b| a.1.base_price.cmp(&b.1.base_price).then_with(|| a.0.cmp(b.0)))
            .map(|(id, _)| *id)
            .ok_or(PricingError::ComponentNotFound {
                kind: "experience",
                id: None,
            })?;
        let cheapest_tier = self.tier_by(snapshot, |a, b| a.cmp(&b))?;
        let priciest_tier = self.tier_by(snapshot, |a, b| b.cmp(&a))?;
        let cheapest_transport = self.transport_by(snapshot, |a, b| a.cmp(&b))?;
        let priciest_transport = self.transport_by(snapshot, |a, b| b.cmp(&a))?;

        // Everything the package offers, trimmed to the selection size limit
        // by keeping the most expensive experiences
        let mut all_experiences: Vec<ObjectId> = snapshot.experiences.keys().copied().collect();
        all_experiences.sort_by(|a, b| {
            let price_a = snapshot.experiences[a].base_price;
            let price_b = snapshot.experiences[b].base_price;
            price_b.cmp(&price_a).then_with(|| a.cmp(b))
        });
        all_experiences.truncate(self.config.max_experiences);

        let min_selection = Selection {
            experience_ids: vec![cheapest_experience],
            hotel_tier_id: cheapest_tier,
            transport_option_id: cheapest_transport,
        };
        let max_selection = Selection {
            experience_ids: all_experiences,
            hotel_tier_id: priciest_tier,
            transport_option_id: priciest_transport,
        };

        let low = self.calculate(snapshot, &min_selection, at)?;
        let high = self.calculate(snapshot, &max_selection, at)?;

        Ok(PriceRange {
            min_price: low.total,
            max_price: high.total,
            currency: self.config.currency.clone(),
        })
    }

    fn check_selection(
        &self,
        snapshot: &CatalogSnapshot,
        selection: &Selection,
    ) -> Result<(), PricingError> {
        if selection.experience_ids.is_empty() {
            return Err(PricingError::InvalidSelection(
                "at least one experience must be selected".to_string(),
            ));
        }
        if selection.experience_ids.len() > self.config.max_experiences {
            return Err(PricingError::InvalidSelection(format!(
                "a booking may include at most {} experiences",
                self.config.max_experiences
            )));
        }

        let mut seen = HashSet::with_capacity(selection.experience_ids.len());
        for id in &selection.experience_ids {
            if !seen.insert(*id) {
                return Err(PricingError::InvalidSelection(format!(
                    "experience {} is selected more than once",
                    id
                )));
            }
        }

        // Package membership is checked before catalog presence, so an id
        // belonging to some other package never leaks catalog state
        for id in &selection.experience_ids {
            if !snapshot.package.allows_experience(id) {
                return Err(PricingError::ComponentNotInPackage {
                    kind: "experience",
                    id: *id,
                });
            }
            if !snapshot.experiences.contains_key(id) {
                return Err(PricingError::ComponentNotFound {
                    kind: "experience",
                    id: Some(*id),
                });
            }
        }

        if !snapshot.package.allows_hotel_tier(&selection.hotel_tier_id) {
            return Err(PricingError::ComponentNotInPackage {
                kind: "hotel_tier",
                id: selection.hotel_tier_id,
            });
        }
        if !snapshot.hotel_tiers.contains_key(&selection.hotel_tier_id) {
            return Err(PricingError::ComponentNotFound {
                kind: "hotel_tier",
                id: Some(selection.hotel_tier_id),
            });
        }

        if !snapshot
            .package
            .allows_transport_option(&selection.transport_option_id)
        {
            return Err(PricingError::ComponentNotInPackage {
                kind: "transport_option",
                id: selection.transport_option_id,
            });
        }
        if !snapshot
            .transport_options
            .contains_key(&selection.transport_option_id)
        {
            return Err(PricingError::ComponentNotFound {
                kind: "transport_option",
                id: Some(selection.transport_option_id),
            });
        }

        Ok(())
    }

    fn tier_by(
        &self,
        snapshot: &CatalogSnapshot,
        order: fn(Decimal, Decimal) -> std::cmp::Ordering,
    ) -> Result<ObjectId, PricingError> {
        snapshot
            .hotel_tiers
            .iter()
            .min_by(|a, b| {
                order(a.1.price_multiplier, b.1.price_multiplier).then_with(|| a.0.cmp(b.0))
            })
            .map(|(id, _)| *id)
            .ok_or(PricingError::ComponentNotFound {
                kind: "hotel_tier",
                id: None,
            })
    }

    fn transport_by(
        &self,
        snapshot: &CatalogSnapshot,
        order: fn(Decimal, Decimal) -> std::cmp::Ordering,
    ) -> Result<ObjectId, PricingError> {
        snapshot
            .transport_options
            .iter()
            .min_by(|a, b| order(a.1.base_price, b.1.base_price).then_with(|| a.0.cmp(b.0)))
            .map(|(id, _)| *id)
            .ok_or(PricingError::ComponentNotFound {
                kind: "transport_option",
                id: None,
            })
    }
}

impl Default for PriceCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Round to two decimal places, away from zero on midpoints. Applied to each
/// recorded breakdown amount before it joins the running total so the lines
/// always sum exactly to the total.
fn to_minor_units(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
