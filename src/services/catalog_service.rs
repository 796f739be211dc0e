use std::collections::HashMap;

use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::Client;

use crate::models::catalog::{Experience, HotelTier, Package, TransportOption};
use crate::models::pricing_rule::PricingRule;
use crate::services::rule_cache::{self, RuleCache};

pub const CATALOG_DB: &str = "Catalog";

#[derive(Debug)]
pub enum CatalogError {
    PackageNotFound(ObjectId),
    Database(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::PackageNotFound(id) => write!(f, "Package {} not found", id),
            CatalogError::Database(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<mongodb::error::Error> for CatalogError {
    fn from(err: mongodb::error::Error) -> Self {
        CatalogError::Database(err.to_string())
    }
}

/// Everything one price calculation reads, loaded up front. The maps hold
/// only the package's *active* eligible components, so a calculation never
/// goes back to the database and always sees one consistent state.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub package_id: ObjectId,
    pub package: Package,
    pub experiences: HashMap<ObjectId, Experience>,
    pub hotel_tiers: HashMap<ObjectId, HotelTier>,
    pub transport_options: HashMap<ObjectId, TransportOption>,
    pub rules: Vec<PricingRule>,
}

/// Load the package, its eligible components, and the current rule set into
/// one immutable snapshot. Rules come through the TTL cache, so an edit may
/// take up to the TTL to show up here.
pub async fn load_snapshot(
    client: &Client,
    cache: &RuleCache,
    package_id: ObjectId,
) -> Result<CatalogSnapshot, CatalogError> {
    let db = client.database(CATALOG_DB);

    let package = db
        .collection::<Package>("Packages")
        .find_one(doc! { "_id": package_id, "active": true })
        .await?
        .ok_or(CatalogError::PackageNotFound(package_id))?;

    let found = db
        .collection::<Experience>("Experiences")
        .find(doc! { "_id": { "$in": package.experience_ids.clone() }, "active": true })
        .await?
        .try_collect::<Vec<Experience>>()
        .await?;
    let mut experiences = HashMap::with_capacity(found.len());
    for experience in found {
        if let Some(id) = experience.id {
            experiences.insert(id, experience);
        }
    }

    let found = db
        .collection::<HotelTier>("HotelTiers")
        .find(doc! { "_id": { "$in": package.hotel_tier_ids.clone() }, "active": true })
        .await?
        .try_collect::<Vec<HotelTier>>()
        .await?;
    let mut hotel_tiers = HashMap::with_capacity(found.len());
    for tier in found {
        if let Some(id) = tier.id {
            hotel_tiers.insert(id, tier);
        }
    }

    let found = db
        .collection::<TransportOption>("TransportOptions")
        .find(doc! { "_id": { "$in": package.transport_option_ids.clone() }, "active": true })
        .await?
        .try_collect::<Vec<TransportOption>>()
        .await?;
    let mut transport_options = HashMap::with_capacity(found.len());
    for option in found {
        if let Some(id) = option.id {
            transport_options.insert(id, option);
        }
    }

    let rules = rule_cache::load_rules(client, cache, &package_id).await?;

    Ok(CatalogSnapshot {
        package_id,
        package,
        experiences,
        hotel_tiers,
        transport_options,
        rules,
    })
}
