use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::services::pricing_service::PriceResult;

/// A booking as the workflow layer persists it. The price snapshot is frozen
/// at booking time: rule and catalog edits after this point never alter it.
/// Repricing only ever happens through the validation guard, which recomputes
/// from current state and refuses payment on mismatch.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub package_id: ObjectId,
    pub experience_ids: Vec<ObjectId>,
    pub hotel_tier_id: ObjectId,
    pub transport_option_id: ObjectId,
    pub status: String,
    pub price_snapshot: PriceResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}
