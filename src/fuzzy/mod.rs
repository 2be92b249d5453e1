//! Fuzzy duplicate detection: string similarity primitives (§4.1) and the
//! parallel pairwise duplicate search engine (§4.6).

mod engine;
mod similarity;

pub use engine::{DuplicateCallback, DuplicateEngine, DuplicatePair};
pub use similarity::{normalize, similarity};
