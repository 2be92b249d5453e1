//! Metadata catalog & persistence: the `MUSIC_FILES` table, its additive
//! schema migration, and the `Catalog` CRUD/search surface (spec §4.4).

mod engine;
mod schema;

pub use engine::Catalog;
