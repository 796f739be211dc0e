use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a rule adjusts the running total. A closed set so the calculator's
/// delta switch is exhaustive; there is no way to express "percentage" and
/// "fixed" at the same time.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    PercentMarkup,
    FixedMarkup,
    PercentDiscount,
    FixedDiscount,
}

impl RuleKind {
    pub fn is_markup(&self) -> bool {
        matches!(self, RuleKind::PercentMarkup | RuleKind::FixedMarkup)
    }

    pub fn is_percentage(&self) -> bool {
        matches!(self, RuleKind::PercentMarkup | RuleKind::PercentDiscount)
    }
}

/// A time-windowed markup or discount, optionally scoped to one package.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PricingRule {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub kind: RuleKind,
    /// Percent points for percentage kinds (5 = 5%), a currency amount for
    /// fixed kinds
    pub value: Decimal,
    /// None applies the rule to every package
    #[serde(default)]
    pub target_package: Option<ObjectId>,
    pub active_from: DateTime<Utc>,
    /// None never expires
    #[serde(default)]
    pub active_to: Option<DateTime<Utc>>,
    /// Manual kill-switch, independent of the date window
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Application order within a calculation; ties broken by id. Chained
    /// rules are not commutative, so this field decides the price.
    pub sequence: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl PricingRule {
    /// Whether this rule participates in a calculation: kill-switch on, the
    /// instant inside the validity window (both ends inclusive), and the rule
    /// either global or targeted at this package.
    pub fn applies_at(&self, at: DateTime<Utc>, package_id: &ObjectId) -> bool {
        if !self.is_active {
            return false;
        }
        if self.active_from > at {
            return false;
        }
        if let Some(until) = self.active_to {
            if until < at {
                return false;
            }
        }
        match &self.target_package {
            Some(target) => target == package_id,
            None => true,
        }
    }
}
