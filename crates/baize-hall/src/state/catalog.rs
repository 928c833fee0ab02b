//! # Market Catalog
//!
//! Read-model of the shared marketplace catalog (item name → current
//! price). The catalog is maintained by the super-admin and lives in the
//! store's cross-hall partition; terminals consume it read-only.
//!
//! Its one job here: supply the price that gets frozen into a session's
//! market line at the moment of first add.

use serde_json::Value;
use std::collections::BTreeMap;

use baize_core::Money;

/// Item name → current price in whole units.
#[derive(Debug, Clone, Default)]
pub struct MarketCatalog {
    prices: BTreeMap<String, i64>,
}

impl MarketCatalog {
    pub fn new() -> Self {
        MarketCatalog::default()
    }

    /// Current price of an item, if listed.
    pub fn price_of(&self, item: &str) -> Option<Money> {
        self.prices.get(item).copied().map(Money::from_units)
    }

    /// Item names in catalog order, for the purchase picker.
    pub fn item_names(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Overwrites from a store snapshot (`{ "name": price, ... }`);
    /// non-object snapshots and non-numeric prices coerce to empty/skipped.
    pub fn apply_snapshot(&mut self, value: Value) {
        self.prices = match value {
            Value::Object(entries) => entries
                .into_iter()
                .filter_map(|(name, price)| price.as_i64().map(|p| (name, p)))
                .collect(),
            _ => BTreeMap::new(),
        };
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
