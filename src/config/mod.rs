//! Application-level paths for vinylcrate.
//!
//! This is distinct from [`crate::profile`], which owns the list of
//! profiles and which one is active; this module only knows where the
//! top-level config directory lives on disk.

mod paths;

pub use paths::Paths;
