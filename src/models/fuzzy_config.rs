//! FuzzyConfig — thresholds and normalization toggles driving duplicate
//! detection, plus the three built-in presets from spec §4.2.

use serde::{Deserialize, Serialize};

use crate::error::VinylError;

/// A named, canonical [`FuzzyConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    Strict,
    Balanced,
    Lenient,
    Custom,
}

/// Immutable fuzzy-duplicate-detection configuration.
///
/// Construct via [`FuzzyConfig::preset`] or [`FuzzyConfig::custom`]; both
/// validate thresholds are within `[0, 100]` and `minimum_fields_to_match >= 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyConfig {
    pub title_threshold: f64,
    pub artist_threshold: f64,
    pub album_threshold: f64,
    pub duration_tolerance_seconds: i32,
    pub duration_tolerance_percent: f64,
    pub ignore_case: bool,
    pub ignore_punctuation: bool,
    pub track_number_must_match: bool,
    pub ignore_artist_prefixes: bool,
    pub ignore_featuring: bool,
    pub ignore_album_editions: bool,
    pub minimum_fields_to_match: u8,
}

impl FuzzyConfig {
    /// Build a config from a built-in preset. Always valid.
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Strict => FuzzyConfig {
                title_threshold: 95.0,
                artist_threshold: 95.0,
                album_threshold: 95.0,
                duration_tolerance_seconds: 3,
                duration_tolerance_percent: 1.0,
                ignore_case: true,
                ignore_punctuation: false,
                track_number_must_match: true,
                ignore_artist_prefixes: false,
                ignore_featuring: false,
                ignore_album_editions: false,
                minimum_fields_to_match: 3,
            },
            Preset::Balanced => FuzzyConfig {
                title_threshold: 85.0,
                artist_threshold: 85.0,
                album_threshold: 85.0,
                duration_tolerance_seconds: 10,
                duration_tolerance_percent: 5.0,
                ignore_case: true,
                ignore_punctuation: true,
                track_number_must_match: false,
                ignore_artist_prefixes: true,
                ignore_featuring: true,
                ignore_album_editions: true,
                minimum_fields_to_match: 2,
            },
            Preset::Lenient => FuzzyConfig {
                title_threshold: 70.0,
                artist_threshold: 70.0,
                album_threshold: 70.0,
                duration_tolerance_seconds: 30,
                duration_tolerance_percent: 10.0,
                ignore_case: true,
                ignore_punctuation: true,
                track_number_must_match: false,
                ignore_artist_prefixes: true,
                ignore_featuring: true,
                ignore_album_editions: true,
                minimum_fields_to_match: 2,
            },
            Preset::Custom => unreachable!("Custom has no canonical values; use `custom()`"),
        }
    }

    /// Build and validate a custom configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn custom(
        title_threshold: f64,
        artist_threshold: f64,
        album_threshold: f64,
        duration_tolerance_seconds: i32,
        duration_tolerance_percent: f64,
        ignore_case: bool,
        ignore_punctuation: bool,
        track_number_must_match: bool,
        ignore_artist_prefixes: bool,
        ignore_featuring: bool,
        ignore_album_editions: bool,
        minimum_fields_to_match: u8,
    ) -> Result<Self, VinylError> {
        let cfg = FuzzyConfig {
            title_threshold,
            artist_threshold,
            album_threshold,
            duration_tolerance_seconds,
            duration_tolerance_percent,
            ignore_case,
            ignore_punctuation,
            track_number_must_match,
            ignore_artist_prefixes,
            ignore_featuring,
            ignore_album_editions,
            minimum_fields_to_match,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), VinylError> {
        for (name, value) in [
            ("title_threshold", self.title_threshold),
            ("artist_threshold", self.artist_threshold),
            ("album_threshold", self.album_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(VinylError::InvalidConfig {
                    reason: format!("{name} must be within [0, 100], got {value}"),
                });
            }
        }
        if self.minimum_fields_to_match < 1 {
            return Err(VinylError::InvalidConfig {
                reason: "minimum_fields_to_match must be >= 1".to_string(),
            });
        }
        Ok(())
    }

    /// Identify this configuration's canonical preset, if it matches one
    /// within 0.1 on thresholds and exactly on booleans/ints; otherwise
    /// `Preset::Custom` (spec §4.2).
    pub fn identify(&self) -> Preset {
        for preset in [Preset::Strict, Preset::Balanced, Preset::Lenient] {
            let canonical = FuzzyConfig::preset(preset);
            if self.matches_within_tolerance(&canonical) {
                return preset;
            }
        }
        Preset::Custom
    }

    fn matches_within_tolerance(&self, other: &FuzzyConfig) -> bool {
        const EPS: f64 = 0.1;
        (self.title_threshold - other.title_threshold).abs() < EPS
            && (self.artist_threshold - other.artist_threshold).abs() < EPS
            && (self.album_threshold - other.album_threshold).abs() < EPS
            && self.duration_tolerance_seconds == other.duration_tolerance_seconds
            && (self.duration_tolerance_percent - other.duration_tolerance_percent).abs() < EPS
            && self.ignore_case == other.ignore_case
            && self.ignore_punctuation == other.ignore_punctuation
            && self.track_number_must_match == other.track_number_must_match
            && self.ignore_artist_prefixes == other.ignore_artist_prefixes
            && self.ignore_featuring == other.ignore_featuring
            && self.ignore_album_editions == other.ignore_album_editions
            && self.minimum_fields_to_match == other.minimum_fields_to_match
    }
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        FuzzyConfig::preset(Preset::Balanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_identify_themselves() {
        assert_eq!(FuzzyConfig::preset(Preset::Strict).identify(), Preset::Strict);
        assert_eq!(FuzzyConfig::preset(Preset::Balanced).identify(), Preset::Balanced);
        assert_eq!(FuzzyConfig::preset(Preset::Lenient).identify(), Preset::Lenient);
    }

    #[test]
    fn tweaked_preset_is_custom() {
        let mut cfg = FuzzyConfig::preset(Preset::Balanced);
        cfg.title_threshold = 50.0;
        assert_eq!(cfg.identify(), Preset::Custom);
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let result = FuzzyConfig::custom(
            150.0, 85.0, 85.0, 10, 5.0, true, true, false, true, true, true, 2,
        );
        assert!(result.is_err());
    }

    #[test]
    fn zero_minimum_fields_rejected() {
        let result = FuzzyConfig::custom(
            85.0, 85.0, 85.0, 10, 5.0, true, true, false, true, true, true, 0,
        );
        assert!(result.is_err());
    }
}
