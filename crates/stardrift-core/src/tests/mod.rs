//! Cross-module scenario tests.
//!
//! - `streaming.rs`: active set, physics membership and re-filing
//! - `persistence.rs`: whole-world save and load
//! - `properties.rs`: invariants over random flight paths
//! - `determinism.rs`: identical inputs give identical worlds
//! - `helpers.rs`: world and entity factories

mod helpers;

pub use helpers::*;
