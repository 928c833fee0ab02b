//! # State Types
//!
//! Terminal-local state: the mutex-guarded [`HallState`] and the market
//! catalog read-model.

mod catalog;
mod hall;

pub use catalog::MarketCatalog;
pub use hall::{HallData, HallState};
