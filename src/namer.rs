//! Turn a centroid back into a label such as `"2016's Indie"`.

use crate::genre::Genre;
use crate::normalize::{DateRange, FeatureWeights};

/// Year the centroid's date coordinate points at.
#[must_use]
pub fn centroid_year(centroid: &[f64], dates: &DateRange, weights: &FeatureWeights) -> String {
    let date_value = centroid.first().copied().unwrap_or(0.0);
    let fraction = if weights.date == 0.0 { 0.0 } else { date_value / weights.date };
    dates.at_position(fraction).format("%Y").to_string()
}

/// Category whose score is nearest the centroid's genre coordinate.
///
/// The coordinate is divided back by the genre weight and truncated to a
/// whole score before the lookup; ties resolve in [`Genre::SCORE_TABLE`] order.
#[must_use]
pub fn centroid_genre(centroid: &[f64], weights: &FeatureWeights) -> Genre {
    let genre_value = centroid.get(1).copied().unwrap_or(0.0);
    let unweighted = if weights.genre.is_normal() {
        genre_value / weights.genre
    } else {
        genre_value
    };
    Genre::nearest(unweighted.trunc())
}

/// `"{year}'s {genre}"` for one centroid. Pure.
#[must_use]
pub fn name_centroid(centroid: &[f64], dates: &DateRange, weights: &FeatureWeights) -> String {
    format!(
        "{}'s {}",
        centroid_year(centroid, dates, weights),
        centroid_genre(centroid, weights)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_release_date;

    fn range(min: &str, max: &str) -> DateRange {
        DateRange {
            min: parse_release_date(min).unwrap(),
            max: parse_release_date(max).unwrap(),
        }
    }

    #[test]
    fn test_names_midpoint_centroid() {
        let weights = FeatureWeights::default();
        let dates = range("2000-01-01", "2020-01-01");
        let centroid = [3.1, 121.7, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        assert_eq!(name_centroid(&centroid, &dates, &weights), "2012's Indie");
    }

    #[test]
    fn test_is_pure() {
        let weights = FeatureWeights::default();
        let dates = range("1970", "2023-05-01");
        let centroid = [1.234, 87.0, 0.3, 0.2, 0.1, 0.9, 0.4, 0.5];
        let first = name_centroid(&centroid, &dates, &weights);
        let second = name_centroid(&centroid, &dates, &weights);
        assert_eq!(first, second);
    }

    #[test]
    fn test_degenerate_date_range() {
        let weights = FeatureWeights::default();
        let dates = range("2020-01-01", "2020-01-01");
        assert_eq!(name_centroid(&[0.0, 250.0], &dates, &weights), "2020's Others");
    }

    #[test]
    fn test_genre_truncates_before_lookup() {
        let weights = FeatureWeights::default();
        // 89.9 truncates to 89: 9 from Pop (80), 11 from Funk (100).
        assert_eq!(centroid_genre(&[0.0, 89.9], &weights), Genre::Pop);
        // 90 sits exactly between Pop and Funk; Pop comes first in the table.
        assert_eq!(centroid_genre(&[0.0, 90.0], &weights), Genre::Pop);
        assert_eq!(centroid_genre(&[0.0, 90.5], &weights), Genre::Pop);
        assert_eq!(centroid_genre(&[0.0, 91.0], &weights), Genre::Funk);
    }

    #[test]
    fn test_genre_weight_is_undone() {
        let weights = FeatureWeights {
            genre: 2.0,
            ..FeatureWeights::default()
        };
        assert_eq!(centroid_genre(&[0.0, 280.0], &weights), Genre::Rock);
    }

    #[test]
    fn test_short_centroid_defaults() {
        let weights = FeatureWeights::default();
        let dates = range("1990", "2000");
        assert_eq!(name_centroid(&[], &dates, &weights), "1990's Soundtracks");
    }
}
