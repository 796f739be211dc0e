pub mod bookings;
pub mod catalog;
pub mod pricing_rule;
