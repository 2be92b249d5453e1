//! ArtistBucketer — frequency-balanced alphabetical grouping of artists
//! into at most 26 buckets, for the `{subdirectory}` template field (§4.8).

use std::collections::BTreeMap;

use crate::models::{ArtistDistribution, Bucket, MusicRecord};

pub struct ArtistBucketer;

impl ArtistBucketer {
    /// Build an [`ArtistDistribution`] from the full set of records, split
    /// into at most `desired_buckets` alphabetical ranges of roughly equal
    /// file count.
    pub fn compute(records: &[MusicRecord], desired_buckets: usize) -> ArtistDistribution {
        let mut artist_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut letter_counts: BTreeMap<char, usize> = BTreeMap::new();

        for record in records {
            let name = record.artist().unwrap_or("Unknown").to_string();
            *artist_counts.entry(name).or_insert(0) += 1;
            let letter = normalized_first_letter(record.artist());
            *letter_counts.entry(letter).or_insert(0) += 1;
        }

        let buckets = split_into_buckets(&letter_counts, desired_buckets);

        ArtistDistribution {
            total_files: records.len(),
            artist_counts,
            buckets,
        }
    }

    /// Return the bucket label whose range contains `artist`'s normalized
    /// first letter.
    pub fn bucket_for(artist: Option<&str>, distribution: &ArtistDistribution) -> String {
        let letter = normalized_first_letter(artist);
        distribution
            .buckets
            .iter()
            .find(|b| b.contains(letter))
            .map(|b| b.label())
            .unwrap_or_else(|| "#".to_string())
    }
}

/// Lowercase, ASCII-alphabetic first character of `artist`; `#` if the name
/// is absent or begins with anything else (digits, symbols, non-ASCII).
fn normalized_first_letter(artist: Option<&str>) -> char {
    artist
        .unwrap_or("Unknown")
        .to_lowercase()
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .unwrap_or('#')
}

/// Single-pass greedy split into at most `k` alphabetical buckets: walks
/// letters in sorted order, closing a bucket once its running sum reaches
/// or crosses the ideal cumulative boundary, preferring whichever of
/// "include this letter" / "stop before it" has the smaller deviation from
/// that boundary (spec §4.8 step 3).
fn split_into_buckets(letter_counts: &BTreeMap<char, usize>, k: usize) -> Vec<Bucket> {
    let letters: Vec<(char, usize)> = letter_counts.iter().map(|(&c, &n)| (c, n)).collect();
    if letters.is_empty() {
        return Vec::new();
    }

    let total: usize = letters.iter().map(|&(_, n)| n).sum();
    let k = k.clamp(1, letters.len().min(26));
    if k == 1 {
        let count: usize = letters.iter().map(|&(_, n)| n).sum();
        return vec![Bucket {
            first: letters.first().unwrap().0,
            last: letters.last().unwrap().0,
            count,
        }];
    }

    let ideal = total as f64 / k as f64;
    let mut buckets = Vec::with_capacity(k);
    let mut start = 0usize;
    let mut cumulative_before_start = 0.0f64;

    for b in 0..(k - 1) {
        let target_absolute = (b as f64 + 1.0) * ideal;
        let mut sum = 0usize;
        let mut end = start;
        for i in start..letters.len() {
            let prev_sum = sum;
            sum += letters[i].1;
            end = i;
            let cumulative = cumulative_before_start + sum as f64;
            if cumulative >= target_absolute {
                let overshoot_include = cumulative - target_absolute;
                let overshoot_exclude =
                    target_absolute - (cumulative_before_start + prev_sum as f64);
                if i > start && prev_sum > 0 && overshoot_exclude <= overshoot_include {
                    end = i - 1;
                    sum = prev_sum;
                }
                break;
            }
        }

        buckets.push(Bucket {
            first: letters[start].0,
            last: letters[end].0,
            count: sum,
        });
        cumulative_before_start += sum as f64;
        start = end + 1;
        if start >= letters.len() {
            break;
        }
    }

    if start < letters.len() {
        let count: usize = letters[start..].iter().map(|&(_, n)| n).sum();
        buckets.push(Bucket {
            first: letters[start].0,
            last: letters.last().unwrap().0,
            count,
        });
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_artist(artist: &str) -> MusicRecord {
        let mut r = MusicRecord::new(format!("/music/{artist}.mp3"), "mp3");
        r.set_artist(Some(artist));
        r
    }

    #[test]
    fn single_bucket_spans_everything() {
        let records: Vec<MusicRecord> = ["Abba", "Bowie", "Zappa"]
            .iter()
            .map(|a| record_with_artist(a))
            .collect();
        let dist = ArtistBucketer::compute(&records, 1);
        assert_eq!(dist.buckets.len(), 1);
        assert_eq!(dist.buckets[0].label(), "A-Z");
    }

    #[test]
    fn buckets_are_deterministic_for_same_input() {
        let records: Vec<MusicRecord> = (0..50)
            .map(|i| record_with_artist(&format!("Artist{}", (b'a' + (i % 26) as u8) as char)))
            .collect();
        let a = ArtistBucketer::compute(&records, 5);
        let b = ArtistBucketer::compute(&records, 5);
        assert_eq!(
            a.buckets.iter().map(|b| b.label()).collect::<Vec<_>>(),
            b.buckets.iter().map(|b| b.label()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn non_letter_artists_go_to_symbolic_bucket() {
        let records = vec![record_with_artist("123 Band"), record_with_artist("Abba")];
        let dist = ArtistBucketer::compute(&records, 2);
        assert!(dist.buckets.iter().any(|b| b.label() == "#"));
    }

    #[test]
    fn bucket_for_roundtrips_with_distribution() {
        let records: Vec<MusicRecord> = ["Abba", "Bowie", "Coldplay", "Dylan", "Zappa"]
            .iter()
            .map(|a| record_with_artist(a))
            .collect();
        let dist = ArtistBucketer::compute(&records, 3);
        for artist in ["Abba", "Bowie", "Coldplay", "Dylan", "Zappa"] {
            let label = ArtistBucketer::bucket_for(Some(artist), &dist);
            assert!(!label.is_empty());
        }
    }

    #[test]
    fn buckets_partition_total_count() {
        let records: Vec<MusicRecord> = (0..200)
            .map(|i| record_with_artist(&format!("{}rtist{}", (b'a' + (i % 26) as u8) as char, i)))
            .collect();
        let dist = ArtistBucketer::compute(&records, 7);
        let sum: usize = dist.buckets.iter().map(|b| b.count).sum();
        assert_eq!(sum, 200);
    }
}
