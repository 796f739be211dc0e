use bson::{oid::ObjectId, DateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single bookable activity. Once a booking's breakdown references an
/// experience, the priced line is frozen on the booking; edits here only
/// affect future quotes.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Experience {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    pub city: String,
    pub base_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<u16>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

/// Hotel quality level. The multiplier scales the combined experience +
/// transport subtotal, typically 1.0 to 4.0.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HotelTier {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub price_multiplier: Decimal,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

/// How the traveler gets there. Priced once per booking.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TransportOption {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub mode: String,
    pub base_price: Decimal,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

/// A curated city package. A selection is valid only if every chosen id is
/// listed in the package's eligible sets.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Package {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub slug: String,
    pub name: String,
    pub city: String,
    pub description: String,
    pub experience_ids: Vec<ObjectId>,
    pub hotel_tier_ids: Vec<ObjectId>,
    pub transport_option_ids: Vec<ObjectId>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl Package {
    pub fn allows_experience(&self, id: &ObjectId) -> bool {
        self.experience_ids.contains(id)
    }

    pub fn allows_hotel_tier(&self, id: &ObjectId) -> bool {
        self.hotel_tier_ids.contains(id)
    }

    pub fn allows_transport_option(&self, id: &ObjectId) -> bool {
        self.transport_option_ids.contains(id)
    }
}
