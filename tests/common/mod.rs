use std::collections::HashMap;

use bson::oid::ObjectId;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use yatra_api::models::catalog::{Experience, HotelTier, Package, TransportOption};
use yatra_api::models::pricing_rule::{PricingRule, RuleKind};
use yatra_api::services::catalog_service::CatalogSnapshot;
use yatra_api::services::pricing_service::Selection;

/// The instant all flow tests price at, well inside every fixture window.
pub fn eval_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn experience(name: &str, base_price: Decimal) -> Experience {
    Experience {
        id: Some(ObjectId::new()),
        name: name.to_string(),
        description: format!("{} description", name),
        city: "Goa".to_string(),
        base_price,
        duration_hours: Some(4),
        active: true,
        created_at: None,
        updated_at: None,
    }
}

pub fn hotel_tier(name: &str, multiplier: Decimal) -> HotelTier {
    HotelTier {
        id: Some(ObjectId::new()),
        name: name.to_string(),
        price_multiplier: multiplier,
        active: true,
        created_at: None,
        updated_at: None,
    }
}

pub fn transport(name: &str, base_price: Decimal) -> TransportOption {
    TransportOption {
        id: Some(ObjectId::new()),
        name: name.to_string(),
        mode: "flight".to_string(),
        base_price,
        active: true,
        created_at: None,
        updated_at: None,
    }
}

pub fn rule(
    name: &str,
    kind: RuleKind,
    value: Decimal,
    sequence: i64,
    target_package: Option<ObjectId>,
) -> PricingRule {
    PricingRule {
        id: Some(ObjectId::new()),
        name: name.to_string(),
        kind,
        value,
        target_package,
        active_from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        active_to: None,
        is_active: true,
        sequence,
        created_at: None,
        updated_at: None,
    }
}

/// A Goa beach package: experiences at 1500 and 800, one x1.5 tier, one
/// 500 transport. Returns the snapshot plus the full selection over it.
pub fn goa_package() -> (CatalogSnapshot, Selection) {
    let scuba = experience("Scuba Dive", dec!(1500));
    let fort_walk = experience("Fort Walk", dec!(800));
    let tier = hotel_tier("Premium", dec!(1.5));
    let flight = transport("Goa Flight", dec!(500));

    let package_id = ObjectId::new();
    let package = Package {
        id: Some(package_id),
        slug: "goa-beaches".to_string(),
        name: "Goa Beaches".to_string(),
        city: "Goa".to_string(),
        description: "Sun, sand and old forts".to_string(),
        experience_ids: vec![scuba.id.unwrap(), fort_walk.id.unwrap()],
        hotel_tier_ids: vec![tier.id.unwrap()],
        transport_option_ids: vec![flight.id.unwrap()],
        active: true,
        created_at: None,
        updated_at: None,
    };

    let selection = Selection {
        experience_ids: vec![scuba.id.unwrap(), fort_walk.id.unwrap()],
        hotel_tier_id: tier.id.unwrap(),
        transport_option_id: flight.id.unwrap(),
    };

    let mut experiences = HashMap::new();
    experiences.insert(scuba.id.unwrap(), scuba);
    experiences.insert(fort_walk.id.unwrap(), fort_walk);
    let mut hotel_tiers = HashMap::new();
    hotel_tiers.insert(tier.id.unwrap(), tier);
    let mut transport_options = HashMap::new();
    transport_options.insert(flight.id.unwrap(), flight);

    let snapshot = CatalogSnapshot {
        package_id,
        package,
        experiences,
        hotel_tiers,
        transport_options,
        rules: Vec::new(),
    };

    (snapshot, selection)
}
