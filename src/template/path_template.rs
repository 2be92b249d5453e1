//! PathTemplate — parses a template string into tokens once at construction
//! and renders a relative path per record (§4.7).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::VinylError;
use crate::models::{ArtistDistribution, MusicRecord};

use super::bucketer::ArtistBucketer;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-zA-Z_]+)(?::0(\d+)d)?\}").unwrap());
static NON_FORMAT_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]+").unwrap());

/// How a substituted placeholder value's separator-like characters are
/// rewritten before being spliced into the path (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextFormat {
    None,
    Underscore,
    Dash,
}

impl TextFormat {
    fn apply(self, value: &str) -> String {
        match self {
            TextFormat::None => value.to_string(),
            TextFormat::Underscore => NON_FORMAT_CHARS.replace_all(value, "_").into_owned(),
            TextFormat::Dash => NON_FORMAT_CHARS.replace_all(value, "-").into_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Artist,
    AlbumArtist,
    Album,
    Title,
    Genre,
    Year,
    TrackNumber,
    BitRate,
    SampleRate,
    FileType,
    Subdirectory,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "artist" => Field::Artist,
            "album_artist" => Field::AlbumArtist,
            "album" => Field::Album,
            "title" => Field::Title,
            "genre" => Field::Genre,
            "year" => Field::Year,
            "track_number" => Field::TrackNumber,
            "bit_rate" => Field::BitRate,
            "sample_rate" => Field::SampleRate,
            "file_type" => Field::FileType,
            "subdirectory" => Field::Subdirectory,
            _ => return None,
        })
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            Field::Year | Field::TrackNumber | Field::BitRate | Field::SampleRate
        )
    }
}

#[derive(Debug, Clone)]
enum Token {
    Literal(String),
    Placeholder { field: Field, width: Option<usize> },
}

/// A parsed, validated path template. Construction is the only place parsing
/// or validation happens; [`PathTemplate::render`] never fails.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    source: String,
    tokens: Vec<TokenRepr>,
    pub text_format: TextFormat,
    pub use_subdirectory_grouping: bool,
    pub subdirectory_levels: u8,
}

#[derive(Debug, Clone)]
struct TokenRepr(Token);

/// On-disk shape of a [`PathTemplate`] — only `source` plus the formatting
/// knobs are persisted; `tokens` is re-derived by parsing `source` again,
/// since `Field`/`Token` carry no serde impls of their own.
#[derive(Serialize, Deserialize)]
struct PathTemplateData {
    source: String,
    text_format: TextFormat,
    use_subdirectory_grouping: bool,
    subdirectory_levels: u8,
}

impl Serialize for PathTemplate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        PathTemplateData {
            source: self.source.clone(),
            text_format: self.text_format,
            use_subdirectory_grouping: self.use_subdirectory_grouping,
            subdirectory_levels: self.subdirectory_levels,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PathTemplate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let data = PathTemplateData::deserialize(deserializer)?;
        PathTemplate::parse(
            data.source,
            data.text_format,
            data.use_subdirectory_grouping,
            data.subdirectory_levels,
        )
        .map_err(serde::de::Error::custom)
    }
}

impl PathTemplate {
    /// Parse and validate `source`. Errors on an unknown field name, on a
    /// zero-padded width applied to a non-integer field, or on a template
    /// that does not end in the literal `.{file_type}` tail.
    pub fn parse(
        source: impl Into<String>,
        text_format: TextFormat,
        use_subdirectory_grouping: bool,
        subdirectory_levels: u8,
    ) -> Result<Self, VinylError> {
        let source = source.into();

        if !(1..=26).contains(&subdirectory_levels) {
            return Err(VinylError::InvalidTemplate {
                reason: format!(
                    "subdirectory_levels must be within [1, 26], got {subdirectory_levels}"
                ),
            });
        }
        if !source.ends_with(".{file_type}") {
            return Err(VinylError::InvalidTemplate {
                reason: "template must end with the literal `.{file_type}` tail".to_string(),
            });
        }

        let tokens = Self::tokenize(&source)?;

        Ok(PathTemplate {
            source,
            tokens,
            text_format,
            use_subdirectory_grouping,
            subdirectory_levels,
        })
    }

    /// A sensible, always-valid default template, per spec §9 scenario S4:
    /// `{artist}/{album}/{track_number:02d}-{title}.{file_type}`.
    pub fn default_template() -> Self {
        PathTemplate::parse(
            "{artist}/{album}/{track_number:02d}-{title}.{file_type}",
            TextFormat::Underscore,
            false,
            26,
        )
        .expect("default template is statically valid")
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn tokenize(source: &str) -> Result<Vec<TokenRepr>, VinylError> {
        let mut tokens = Vec::new();
        let mut last_end = 0;

        for caps in PLACEHOLDER.captures_iter(source) {
            let whole = caps.get(0).unwrap();
            if whole.start() > last_end {
                tokens.push(TokenRepr(Token::Literal(
                    source[last_end..whole.start()].to_string(),
                )));
            }

            let field_name = &caps[1];
            let field = Field::parse(field_name).ok_or_else(|| VinylError::InvalidTemplate {
                reason: format!("unknown template field `{field_name}`"),
            })?;

            let width = match caps.get(2) {
                Some(m) => {
                    if !field.is_numeric() {
                        return Err(VinylError::InvalidTemplate {
                            reason: format!(
                                "field `{field_name}` is not an integer field and cannot use a zero-padded width"
                            ),
                        });
                    }
                    Some(m.as_str().parse::<usize>().map_err(|_| {
                        VinylError::InvalidTemplate {
                            reason: format!("invalid width in `{{{field_name}:...}}`"),
                        }
                    })?)
                }
                None => None,
            };

            tokens.push(TokenRepr(Token::Placeholder { field, width }));
            last_end = whole.end();
        }

        if last_end < source.len() {
            tokens.push(TokenRepr(Token::Literal(source[last_end..].to_string())));
        }

        Ok(tokens)
    }

    /// Render the relative (platform-neutral, `/`-separated) path for
    /// `record`, substituting `{subdirectory}` from `distribution` via
    /// [`ArtistBucketer::bucket_for`].
    pub fn render(&self, record: &MusicRecord, distribution: &ArtistDistribution) -> String {
        let mut out = String::new();

        for TokenRepr(token) in &self.tokens {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Placeholder { field, width } => {
                    let raw = self.raw_value(*field, record, distribution, *width);
                    out.push_str(&self.text_format.apply(&raw));
                }
            }
        }

        out
    }

    fn raw_value(
        &self,
        field: Field,
        record: &MusicRecord,
        distribution: &ArtistDistribution,
        width: Option<usize>,
    ) -> String {
        match field {
            Field::Artist => text_or_unknown(record.artist()),
            Field::AlbumArtist => text_or_unknown(record.album_artist()),
            Field::Album => text_or_unknown(record.album()),
            Field::Title => text_or_unknown(record.title()),
            Field::Genre => text_or_unknown(record.genre()),
            Field::FileType => record.file_type().to_string(),
            Field::Subdirectory => {
                ArtistBucketer::bucket_for(record.artist(), distribution)
            }
            Field::Year => number_or_unknown(record.year(), width),
            Field::TrackNumber => number_or_unknown(record.track_number(), width),
            Field::BitRate => number_or_unknown(record.bit_rate(), width),
            Field::SampleRate => number_or_unknown(record.sample_rate(), width),
        }
    }
}

fn text_or_unknown(value: Option<&str>) -> String {
    match value {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "Unknown".to_string(),
    }
}

fn number_or_unknown(value: Option<i32>, width: Option<usize>) -> String {
    match (value, width) {
        (Some(n), Some(w)) => format!("{n:0w$}", w = w),
        (Some(n), None) => n.to_string(),
        (None, _) => "Unknown".to_string(),
    }
}

impl PartialEq for PathTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.text_format == other.text_format
            && self.use_subdirectory_grouping == other.use_subdirectory_grouping
            && self.subdirectory_levels == other.subdirectory_levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bucket;

    fn sample_record() -> MusicRecord {
        let mut r = MusicRecord::new("/music/wall.mp3", "mp3");
        r.set_artist(Some("Pink Floyd"));
        r.set_album(Some("The Wall"));
        r.set_title(Some("Another Brick in the Wall, Pt. 2"));
        r.set_track_number(Some(3));
        r
    }

    #[test]
    fn s4_template_render_scenario() {
        let template = PathTemplate::parse(
            "{artist}/{album}/{track_number:02d}-{title}.{file_type}",
            TextFormat::Underscore,
            false,
            26,
        )
        .unwrap();
        let distribution = ArtistDistribution::default();
        let rendered = template.render(&sample_record(), &distribution);
        assert_eq!(
            rendered,
            "Pink_Floyd/The_Wall/03-Another_Brick_in_the_Wall_Pt_2.mp3"
        );
    }

    #[test]
    fn unknown_field_rejected() {
        let result = PathTemplate::parse("{not_a_field}.{file_type}", TextFormat::None, false, 26);
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_type_tail_rejected() {
        let result = PathTemplate::parse("{artist}/{title}", TextFormat::None, false, 26);
        assert!(result.is_err());
    }

    #[test]
    fn width_on_text_field_rejected() {
        let result = PathTemplate::parse("{title:03d}.{file_type}", TextFormat::None, false, 26);
        assert!(result.is_err());
    }

    #[test]
    fn missing_value_becomes_unknown() {
        let template =
            PathTemplate::parse("{artist}/{title}.{file_type}", TextFormat::None, false, 26)
                .unwrap();
        let record = MusicRecord::new("/music/untitled.mp3", "mp3");
        let distribution = ArtistDistribution::default();
        assert_eq!(
            template.render(&record, &distribution),
            "Unknown/Unknown.mp3"
        );
    }

    #[test]
    fn subdirectory_placeholder_uses_bucketer() {
        let template = PathTemplate::parse(
            "{subdirectory}/{artist}.{file_type}",
            TextFormat::None,
            true,
            2,
        )
        .unwrap();
        let mut distribution = ArtistDistribution::default();
        distribution.buckets.push(Bucket {
            first: '#',
            last: 'm',
            count: 1,
        });
        distribution.buckets.push(Bucket {
            first: 'n',
            last: 'z',
            count: 0,
        });
        let record = sample_record();
        let rendered = template.render(&record, &distribution);
        assert!(rendered.starts_with("#-M/"));
    }
}
