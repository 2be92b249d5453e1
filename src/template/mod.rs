//! Path template rendering (§4.7) and artist bucketing (§4.8).

mod bucketer;
mod path_template;

pub use bucketer::ArtistBucketer;
pub use path_template::{PathTemplate, TextFormat};
