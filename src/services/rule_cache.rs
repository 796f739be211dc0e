use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::Client;
use serde::Serialize;

use crate::models::pricing_rule::PricingRule;

pub const PRICING_DB: &str = "Pricing";

#[derive(Debug, Default)]
struct CacheCounters {
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
    expired_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RuleCacheStats {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
}

struct CacheEntry {
    rules: Vec<PricingRule>,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

/// Short-lived cache for the rule sets read on every calculation. Rules
/// change orders of magnitude less often than prices are computed, so
/// expiry is time-based only: an admin edit becomes visible within one TTL,
/// and the validation guard reprices from whatever set is current at payment
/// time.
pub struct RuleCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    counters: CacheCounters,
}

impl RuleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            counters: CacheCounters::default(),
        }
    }

    pub fn get(&self, package_id: &ObjectId) -> Option<Vec<PricingRule>> {
        let key = cache_key(package_id);
        let mut entries = self.entries.lock().unwrap();
        match entries.get(&key) {
            Some(entry) if entry.is_expired(self.ttl) => {
                entries.remove(&key);
                self.counters.expired_count.fetch_add(1, Ordering::SeqCst);
                self.counters.miss_count.fetch_add(1, Ordering::SeqCst);
                None
            }
            Some(entry) => {
                self.counters.hit_count.fetch_add(1, Ordering::SeqCst);
                Some(entry.rules.clone())
            }
            None => {
                self.counters.miss_count.fetch_add(1, Ordering::SeqCst);
                None
            }
        }
    }

    pub fn store(&self, package_id: &ObjectId, rules: Vec<PricingRule>) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            cache_key(package_id),
            CacheEntry {
                rules,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn stats(&self) -> RuleCacheStats {
        RuleCacheStats {
            items_count: self.entries.lock().unwrap().len(),
            hit_count: self.counters.hit_count.load(Ordering::SeqCst),
            miss_count: self.counters.miss_count.load(Ordering::SeqCst),
            expired_count: self.counters.expired_count.load(Ordering::SeqCst),
        }
    }
}

fn cache_key(package_id: &ObjectId) -> String {
    package_id.to_hex()
}

/// Read-through fetch: cached set if fresh, otherwise one query for the
/// global rules plus the ones targeted at this package. Window filtering
/// stays in the calculator so a cached set can serve any evaluation instant
/// within the TTL.
pub async fn load_rules(
    client: &Client,
    cache: &RuleCache,
    package_id: &ObjectId,
) -> Result<Vec<PricingRule>, mongodb::error::Error> {
    if let Some(rules) = cache.get(package_id) {
        return Ok(rules);
    }

    let collection = client
        .database(PRICING_DB)
        .collection::<PricingRule>("Rules");
    let filter = doc! {
        "is_active": true,
        "$or": [
            { "target_package": null },
            { "target_package": *package_id },
        ],
    };
    let rules = collection
        .find(filter)
        .sort(doc! { "sequence": 1 })
        .await?
        .try_collect::<Vec<PricingRule>>()
        .await?;

    cache.store(package_id, rules.clone());
    Ok(rules)
}
