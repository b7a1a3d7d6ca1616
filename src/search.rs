//! Search: request compilation, engine client, and hit/store reconciliation.
//!
//! The compiler turns a declarative `SearchRequest` into one `_search` body
//! (query + aggregations + sort + highlight); the reconciler zips the
//! engine's hits back onto canonical store records and tolerates index/store
//! drift.

pub mod client;
pub mod compile;
pub mod reconcile;

pub use client::{HttpSearchClient, SearchEngine};
pub use compile::compile;
pub use reconcile::{
    merge_search_metadata, parse_facets, parse_geohash_grid, parse_response, reconcile,
    FacetBucket, SearchHit, SearchOutcome,
};
