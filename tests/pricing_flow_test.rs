mod common;

use rust_decimal_macros::dec;

use common::{eval_time, goa_package, rule};
use yatra_api::models::bookings::Booking;
use yatra_api::models::pricing_rule::RuleKind;
use yatra_api::services::price_guard::{PriceGuard, PriceGuardError};
use yatra_api::services::pricing_service::{PriceCalculator, PricingConfig};

fn calculator() -> PriceCalculator {
    PriceCalculator::with_config(PricingConfig::default())
}

#[test]
fn test_quote_then_validate_flow() {
    let (mut snapshot, selection) = goa_package();
    snapshot
        .rules
        .push(rule("Peak Season", RuleKind::PercentMarkup, dec!(5), 1, None));
    snapshot.rules.push(rule(
        "Goa Promo",
        RuleKind::FixedDiscount,
        dec!(500),
        2,
        Some(snapshot.package_id),
    ));

    // Checkout display: the client gets a quote
    let quoted = calculator()
        .calculate(&snapshot, &selection, eval_time())
        .unwrap();
    assert_eq!(quoted.total, dec!(3910.00));

    // Payment intent creation: the guard reprices and agrees
    let guard = PriceGuard::new(calculator());
    let validated = guard
        .validate(&snapshot, &selection, quoted.total, eval_time())
        .unwrap();
    assert_eq!(validated, quoted);
}

#[test]
fn test_rule_change_between_quote_and_payment_is_caught() {
    let (mut snapshot, selection) = goa_package();

    let quoted = calculator()
        .calculate(&snapshot, &selection, eval_time())
        .unwrap();

    // An admin ships a surcharge after the quote was shown
    snapshot.rules.push(rule(
        "Late Surcharge",
        RuleKind::FixedMarkup,
        dec!(250),
        1,
        None,
    ));

    let guard = PriceGuard::new(calculator());
    let err = guard
        .validate(&snapshot, &selection, quoted.total, eval_time())
        .unwrap_err();

    match err {
        PriceGuardError::Mismatch { expected, asserted } => {
            assert_eq!(expected, quoted.total + dec!(250));
            assert_eq!(asserted, quoted.total);
        }
        other => panic!("expected a mismatch, got {:?}", other),
    }
}

#[test]
fn test_quote_is_stable_across_repeated_requests() {
    let (mut snapshot, selection) = goa_package();
    snapshot.rules.push(rule(
        "Peak Season",
        RuleKind::PercentMarkup,
        dec!(12.5),
        1,
        None,
    ));

    let calc = calculator();
    let quotes: Vec<_> = (0..5)
        .map(|_| calc.calculate(&snapshot, &selection, eval_time()).unwrap())
        .collect();

    for quote in &quotes[1..] {
        assert_eq!(*quote, quotes[0]);
    }
}

#[test]
fn test_booked_snapshot_survives_rule_changes() {
    let (mut snapshot, selection) = goa_package();

    let quoted = calculator()
        .calculate(&snapshot, &selection, eval_time())
        .unwrap();

    // The workflow persists the quote on the booking record
    let booking = Booking {
        id: None,
        user_id: bson::oid::ObjectId::new(),
        package_id: snapshot.package_id,
        experience_ids: selection.experience_ids.clone(),
        hotel_tier_id: selection.hotel_tier_id,
        transport_option_id: selection.transport_option_id,
        status: "confirmed".to_string(),
        price_snapshot: quoted.clone(),
        created_at: None,
        updated_at: None,
    };

    // Rules change afterwards; fresh quotes move, the booking does not
    snapshot.rules.push(rule(
        "New Surcharge",
        RuleKind::FixedMarkup,
        dec!(300),
        1,
        None,
    ));
    let repriced = calculator()
        .calculate(&snapshot, &selection, eval_time())
        .unwrap();

    assert_ne!(repriced.total, booking.price_snapshot.total);
    assert_eq!(booking.price_snapshot, quoted);
}

#[test]
fn test_range_covers_every_valid_quote() {
    let (mut snapshot, selection) = goa_package();
    snapshot
        .rules
        .push(rule("Peak Season", RuleKind::PercentMarkup, dec!(5), 1, None));

    let calc = calculator();
    let range = calc.estimate_range(&snapshot, eval_time()).unwrap();
    let quoted = calc.calculate(&snapshot, &selection, eval_time()).unwrap();

    assert!(range.min_price <= quoted.total);
    assert!(quoted.total <= range.max_price);
}
