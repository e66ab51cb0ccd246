//! # GW-03 Grid Ranking
//!
//! Turns a discover catalog into exactly three ranked placement
//! recommendations. Extraction is lenient (malformed items are skipped,
//! the flow only fails when nothing parses); arity is strict (downstream
//! storage always sees three slots, padded by duplication when the catalog
//! is thin).

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod extract;
pub mod rank;

pub use extract::{extract_candidates, CandidateItem};
pub use rank::{rank_candidates, RankedCatalog, RankingService};

/// Subsystem identifier used in log prefixes.
pub const SUBSYSTEM: &str = "gw-03";
