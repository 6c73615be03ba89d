//! Listening-taste summary shown before organizing.

use crate::genre::{resolve_categories, Genre, GenreReducer};
use crate::track::EnrichedTrack;

/// The `top` most common resolved categories across the library.
///
/// Every category a track resolves to counts once for that track. Equal
/// counts keep the order in which the categories were first seen.
pub fn favorite_genres<R>(tracks: &[EnrichedTrack], reducer: &R, top: usize) -> Vec<(Genre, usize)>
where
    R: GenreReducer + ?Sized,
{
    let mut counts: Vec<(Genre, usize)> = Vec::new();
    for track in tracks {
        for genre in resolve_categories(&track.genres, reducer) {
            match counts.iter_mut().find(|(g, _)| *g == genre) {
                Some((_, count)) => *count += 1,
                None => counts.push((genre, 1)),
            }
        }
    }
    // Stable sort keeps first-seen order among ties.
    counts.sort_by(|(_, a), (_, b)| b.cmp(a));
    counts.truncate(top);
    counts
}

/// One-line greeting naming the three favourite genres.
pub fn taste_summary<R>(tracks: &[EnrichedTrack], reducer: &R) -> String
where
    R: GenreReducer + ?Sized,
{
    let favorites = favorite_genres(tracks, reducer, 3);
    if favorites.is_empty() {
        return "Hi! Not enough genre data yet".to_string();
    }
    let names: Vec<&str> = favorites.iter().map(|(genre, _)| genre.label()).collect();
    format!("Hi! Favorite genres are {}", names.join(", "))
}
