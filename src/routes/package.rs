use actix_web::{web, HttpResponse, Responder};
use bson::{doc, oid::ObjectId};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::catalog::Package;
use crate::services::catalog_service::{self, CatalogError, CATALOG_DB};
use crate::services::price_guard::{PriceGuard, PriceGuardError};
use crate::services::pricing_service::{PriceCalculator, PricingConfig, PricingError, Selection};
use crate::services::rule_cache::RuleCache;

#[derive(Debug, Deserialize)]
pub struct SelectionInput {
    pub experience_ids: Option<Vec<String>>,
    pub hotel_tier_id: Option<String>,
    pub transport_option_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidatePriceInput {
    #[serde(flatten)]
    pub selection: SelectionInput,
    pub asserted_total: Option<Decimal>,
}

/*
    /api/packages
*/
pub async fn get_packages(data: web::Data<Arc<Client>>) -> impl Responder {
    let client = data.into_inner();
    let collection: mongodb::Collection<Package> =
        client.database(CATALOG_DB).collection("Packages");

    match collection.find(doc! { "active": true }).await {
        Ok(cursor) => match cursor.try_collect::<Vec<Package>>().await {
            Ok(packages) => HttpResponse::Ok().json(packages),
            Err(err) => {
                eprintln!("Failed to collect packages: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve packages")
            }
        },
        Err(err) => {
            eprintln!("Failed to find packages: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to retrieve packages")
        }
    }
}

/*
    /api/packages/{id}
*/
pub async fn get_by_id(path: web::Path<String>, data: web::Data<Arc<Client>>) -> impl Responder {
    let client = data.into_inner();
    let collection: mongodb::Collection<Package> =
        client.database(CATALOG_DB).collection("Packages");
    let id: ObjectId = match ObjectId::parse_str(path.into_inner().as_str()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid ID"),
    };

    match collection.find_one(doc! { "_id": id, "active": true }).await {
        Ok(Some(package)) => HttpResponse::Ok().json(package),
        Ok(None) => HttpResponse::NotFound().body("Package not found"),
        Err(err) => {
            eprintln!("Failed to retrieve package: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to retrieve package")
        }
    }
}

/*
    /api/packages/{id}/calculate_price

    The server-computed quote. The client never supplies a price here; it
    only picks components, and the breakdown in the response is what the
    booking workflow later persists as the frozen snapshot.
*/
pub async fn calculate_price(
    path: web::Path<String>,
    data: web::Data<Arc<Client>>,
    cache: web::Data<Arc<RuleCache>>,
    config: web::Data<PricingConfig>,
    input: web::Json<SelectionInput>,
) -> impl Responder {
    let client = data.into_inner();
    let package_id: ObjectId = match ObjectId::parse_str(path.into_inner().as_str()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid ID"),
    };

    let selection = match parse_selection(&input) {
        Ok(selection) => selection,
        Err(err) => return pricing_error_response(&err),
    };

    let snapshot = match catalog_service::load_snapshot(&client, &cache, package_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => return catalog_error_response(err),
    };

    let calculator = PriceCalculator::with_config(config.get_ref().clone());
    match calculator.calculate(&snapshot, &selection, Utc::now()) {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(err) => pricing_error_response(&err),
    }
}

/*
    /api/packages/{id}/price_range
*/
pub async fn price_range(
    path: web::Path<String>,
    data: web::Data<Arc<Client>>,
    cache: web::Data<Arc<RuleCache>>,
    config: web::Data<PricingConfig>,
) -> impl Responder {
    let client = data.into_inner();
    let package_id: ObjectId = match ObjectId::parse_str(path.into_inner().as_str()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid ID"),
    };

    let snapshot = match catalog_service::load_snapshot(&client, &cache, package_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => return catalog_error_response(err),
    };

    let calculator = PriceCalculator::with_config(config.get_ref().clone());
    match calculator.estimate_range(&snapshot, Utc::now()) {
        Ok(range) => HttpResponse::Ok().json(range),
        Err(err) => pricing_error_response(&err),
    }
}

/*
    /api/packages/{id}/validate_price

    Called by the booking workflow right before payment capture. On mismatch
    the workflow must surface "price has changed, please retry" and never
    proceed with the asserted amount.
*/
pub async fn validate_price(
    path: web::Path<String>,
    data: web::Data<Arc<Client>>,
    cache: web::Data<Arc<RuleCache>>,
    config: web::Data<PricingConfig>,
    input: web::Json<ValidatePriceInput>,
) -> impl Responder {
    let client = data.into_inner();
    let package_id: ObjectId = match ObjectId::parse_str(path.into_inner().as_str()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid ID"),
    };

    let selection = match parse_selection(&input.selection) {
        Ok(selection) => selection,
        Err(err) => return pricing_error_response(&err),
    };
    let asserted_total = match input.asserted_total {
        Some(total) => total,
        None => {
            return pricing_error_response(&PricingError::MissingRequiredComponent(
                "asserted_total",
            ))
        }
    };

    let snapshot = match catalog_service::load_snapshot(&client, &cache, package_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => return catalog_error_response(err),
    };

    let guard = PriceGuard::new(PriceCalculator::with_config(config.get_ref().clone()));
    match guard.validate(&snapshot, &selection, asserted_total, Utc::now()) {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(PriceGuardError::Mismatch { expected, asserted }) => {
            HttpResponse::Conflict().json(serde_json::json!({
                "error": "price_mismatch",
                "message": "Package price has changed, please re-quote",
                "expected": expected,
                "asserted": asserted,
            }))
        }
        Err(PriceGuardError::Pricing(err)) => pricing_error_response(&err),
    }
}

fn parse_selection(input: &SelectionInput) -> Result<Selection, PricingError> {
    let raw_ids = match &input.experience_ids {
        Some(ids) => ids,
        None => return Err(PricingError::MissingRequiredComponent("experience_ids")),
    };
    let mut experience_ids = Vec::with_capacity(raw_ids.len());
    for raw in raw_ids {
        match ObjectId::parse_str(raw) {
            Ok(id) => experience_ids.push(id),
            Err(_) => {
                return Err(PricingError::InvalidSelection(format!(
                    "'{}' is not a valid experience id",
                    raw
                )))
            }
        }
    }

    let hotel_tier_id = match &input.hotel_tier_id {
        Some(raw) => ObjectId::parse_str(raw).map_err(|_| {
            PricingError::InvalidSelection(format!("'{}' is not a valid hotel tier id", raw))
        })?,
        None => return Err(PricingError::MissingRequiredComponent("hotel_tier_id")),
    };
    let transport_option_id = match &input.transport_option_id {
        Some(raw) => ObjectId::parse_str(raw).map_err(|_| {
            PricingError::InvalidSelection(format!("'{}' is not a valid transport option id", raw))
        })?,
        None => {
            return Err(PricingError::MissingRequiredComponent(
                "transport_option_id",
            ))
        }
    };

    Ok(Selection {
        experience_ids,
        hotel_tier_id,
        transport_option_id,
    })
}

fn pricing_error_response(err: &PricingError) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": err.kind(),
        "message": err.to_string(),
    }))
}

fn catalog_error_response(err: CatalogError) -> HttpResponse {
    match err {
        CatalogError::PackageNotFound(_) => HttpResponse::NotFound().body("Package not found"),
        CatalogError::Database(err) => {
            eprintln!("Failed to load catalog snapshot: {}", err);
            HttpResponse::InternalServerError().body("Failed to load catalog")
        }
    }
}
