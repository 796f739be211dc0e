pub mod catalog_service;
pub mod price_guard;
pub mod pricing_service;
pub mod rule_cache;
