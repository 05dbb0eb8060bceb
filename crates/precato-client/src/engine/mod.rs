//! Ceiling-based accumulation and classification of claims.
//!
//! Leaves first: [`normalize`] and [`reference`] turn the external ceiling
//! table into lookups, [`cache`] keeps it fresh, [`resolver`] maps entity
//! names onto it, [`aggregate`] computes running totals from the store,
//! [`classify`] bands the result and [`enrich`] ties it all together.

pub mod aggregate;
pub mod cache;
pub mod classify;
pub mod enrich;
pub mod normalize;
pub mod reference;
pub mod resolver;

pub use aggregate::{ClaimStore, SqliteClaimStore};
pub use cache::{CacheStatus, Clock, ReferenceCache, SystemClock};
pub use classify::MaturityBand;
pub use enrich::{ClaimRecord, Classification, ClassificationStatus, EnrichmentEngine, EnrichmentReport};
pub use reference::{FileReferenceLoader, ReferenceLoader, ReferenceTable};
pub use resolver::{EntityKeyResolver, MatchStrategy, Resolution};
