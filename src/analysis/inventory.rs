//! Client inventory sync against a master catalog.
//!
//! Joins client products to catalog items on product id with a single
//! hash index, so the cost is linear in both inputs. A product id is
//! synced at most once.

use crate::models::{CatalogItem, Product, RecordId, SyncedProduct};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Outcome of a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncOutcome {
    /// Joined products, in client input order.
    pub synced: Vec<SyncedProduct>,
    /// Product ids seen more than once (later occurrences were dropped).
    pub duplicates: Vec<RecordId>,
    /// Product ids with no catalog entry.
    pub unmatched: Vec<RecordId>,
}

/// Join client products with the master catalog.
pub fn sync_inventory(products: &[Product], catalog: &[CatalogItem]) -> SyncOutcome {
    let names: HashMap<&RecordId, &str> = catalog
        .iter()
        .map(|item| (&item.id, item.name.as_str()))
        .collect();

    let mut seen: HashSet<&RecordId> = HashSet::new();
    let mut outcome = SyncOutcome::default();

    for product in products {
        if !seen.insert(&product.id) {
            debug!("Duplicate product id {}, skipping", product.id);
            outcome.duplicates.push(product.id.clone());
            continue;
        }

        match names.get(&product.id) {
            Some(name) => outcome.synced.push(SyncedProduct {
                id: product.id.clone(),
                name: (*name).to_string(),
                price: product.price,
            }),
            None => outcome.unmatched.push(product.id.clone()),
        }
    }

    outcome
}
