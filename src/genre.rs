//! Coarse genre taxonomy.
//!
//! Raw artist tags (thousands of free-text strings like `"chamber pop"` or
//! `"uk drill"`) are reduced to one of 13 fixed categories before they reach
//! the feature vector. The reduction itself sits behind [`GenreReducer`] so a
//! caller can inject its own lookup table; [`KeywordReducer`] is the one the
//! CLI ships with.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One of the 13 coarse categories a raw tag can reduce to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Genre {
    Soundtracks,
    Classical,
    Jazz,
    #[serde(rename = "Country/Folk")]
    CountryFolk,
    #[serde(rename = "RnB/Soul")]
    RnbSoul,
    Pop,
    Funk,
    Indie,
    Rock,
    #[serde(rename = "Hip-Hop")]
    HipHop,
    Electronic,
    Experimental,
    /// Catch-all sentinel.
    Others,
}

impl Genre {
    /// Score table in canonical iteration order.
    ///
    /// The order matters: nearest-score lookups walk this slice front to back
    /// and keep the first minimal difference.
    pub const SCORE_TABLE: [(Genre, u32); 13] = [
        (Genre::Soundtracks, 0),
        (Genre::Classical, 10),
        (Genre::Jazz, 20),
        (Genre::CountryFolk, 40),
        (Genre::RnbSoul, 60),
        (Genre::Pop, 80),
        (Genre::Funk, 100),
        (Genre::Indie, 120),
        (Genre::Rock, 140),
        (Genre::HipHop, 160),
        (Genre::Electronic, 180),
        (Genre::Experimental, 200),
        (Genre::Others, 250),
    ];

    /// Dominant-genre priority, niche first. The first category a track has wins.
    pub const PRIORITY: [Genre; 13] = [
        Genre::Soundtracks,
        Genre::Classical,
        Genre::Experimental,
        Genre::Jazz,
        Genre::CountryFolk,
        Genre::Funk,
        Genre::Indie,
        Genre::Rock,
        Genre::RnbSoul,
        Genre::HipHop,
        Genre::Electronic,
        Genre::Pop,
        Genre::Others,
    ];

    /// Display label, also used inside playlist names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Genre::Soundtracks => "Soundtracks",
            Genre::Classical => "Classical",
            Genre::Jazz => "Jazz",
            Genre::CountryFolk => "Country/Folk",
            Genre::RnbSoul => "RnB/Soul",
            Genre::Pop => "Pop",
            Genre::Funk => "Funk",
            Genre::Indie => "Indie",
            Genre::Rock => "Rock",
            Genre::HipHop => "Hip-Hop",
            Genre::Electronic => "Electronic",
            Genre::Experimental => "Experimental",
            Genre::Others => "Others",
        }
    }

    /// Position of this category on the genre-similarity axis.
    #[must_use]
    pub fn score(self) -> u32 {
        Self::SCORE_TABLE
            .iter()
            .find(|(genre, _)| *genre == self)
            .map_or(0, |(_, score)| *score)
    }

    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        matches!(self, Genre::Others)
    }

    /// Category whose score is closest to `value`.
    ///
    /// Walks [`Genre::SCORE_TABLE`] in order; on a tie the earlier entry is kept.
    #[must_use]
    pub fn nearest(value: f64) -> Genre {
        let mut closest = Genre::Others;
        let mut min_difference = f64::INFINITY;
        for (genre, score) in Self::SCORE_TABLE {
            let difference = (value - f64::from(score)).abs();
            if difference < min_difference {
                min_difference = difference;
                closest = genre;
            }
        }
        closest
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::SCORE_TABLE
            .iter()
            .map(|(genre, _)| *genre)
            .find(|genre| genre.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown genre category: {wanted}"))
    }
}

/// Maps a free-text genre tag onto a coarse [`Genre`]. Must be total.
pub trait GenreReducer: Send + Sync {
    fn reduce(&self, tag: &str) -> Genre;
}

impl<F> GenreReducer for F
where
    F: Fn(&str) -> Genre + Send + Sync,
{
    fn reduce(&self, tag: &str) -> Genre {
        self(tag)
    }
}

lazy_static::lazy_static! {
    /// Exact tag names that would otherwise be caught by the wrong keyword.
    static ref EXACT_TAGS: HashMap<&'static str, Genre> = {
        let mut tags = HashMap::new();
        tags.insert("soundtrack", Genre::Soundtracks);
        tags.insert("video game music", Genre::Soundtracks);
        tags.insert("show tunes", Genre::Soundtracks);
        tags.insert("rap", Genre::HipHop);
        tags.insert("trap", Genre::HipHop);
        tags.insert("drill", Genre::HipHop);
        tags.insert("grime", Genre::HipHop);
        tags.insert("k-pop", Genre::Pop);
        tags.insert("j-pop", Genre::Pop);
        tags.insert("indie pop", Genre::Indie);
        tags.insert("indie rock", Genre::Indie);
        tags.insert("art pop", Genre::Experimental);
        tags.insert("pop punk", Genre::Rock);
        tags.insert("pop rap", Genre::HipHop);
        tags.insert("neo soul", Genre::RnbSoul);
        tags.insert("singer-songwriter", Genre::CountryFolk);
        tags
    };
}

/// Substring rules, checked in order after the exact table.
const KEYWORDS: [(&str, Genre); 38] = [
    ("soundtrack", Genre::Soundtracks),
    ("score", Genre::Soundtracks),
    ("anime", Genre::Soundtracks),
    ("classical", Genre::Classical),
    ("orchestra", Genre::Classical),
    ("baroque", Genre::Classical),
    ("opera", Genre::Classical),
    ("experimental", Genre::Experimental),
    ("avant", Genre::Experimental),
    ("noise", Genre::Experimental),
    ("jazz", Genre::Jazz),
    ("bebop", Genre::Jazz),
    ("swing", Genre::Jazz),
    ("country", Genre::CountryFolk),
    ("folk", Genre::CountryFolk),
    ("bluegrass", Genre::CountryFolk),
    ("americana", Genre::CountryFolk),
    ("funk", Genre::Funk),
    ("disco", Genre::Funk),
    ("indie", Genre::Indie),
    ("shoegaze", Genre::Indie),
    ("rock", Genre::Rock),
    ("metal", Genre::Rock),
    ("punk", Genre::Rock),
    ("grunge", Genre::Rock),
    ("r&b", Genre::RnbSoul),
    ("rnb", Genre::RnbSoul),
    ("soul", Genre::RnbSoul),
    ("hip hop", Genre::HipHop),
    ("hip-hop", Genre::HipHop),
    ("rap", Genre::HipHop),
    ("electro", Genre::Electronic),
    ("house", Genre::Electronic),
    ("techno", Genre::Electronic),
    ("edm", Genre::Electronic),
    ("dubstep", Genre::Electronic),
    ("trance", Genre::Electronic),
    ("pop", Genre::Pop),
];

/// Table-driven reducer bundled with the CLI.
///
/// Resolution order: a category label itself (`"Hip-Hop"`), an exact known tag,
/// then the first matching keyword. Anything else is [`Genre::Others`].
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordReducer;

impl GenreReducer for KeywordReducer {
    fn reduce(&self, tag: &str) -> Genre {
        if let Ok(genre) = tag.parse::<Genre>() {
            return genre;
        }
        let tag = tag.trim().to_lowercase();
        if let Some(genre) = EXACT_TAGS.get(tag.as_str()) {
            return *genre;
        }
        KEYWORDS
            .iter()
            .find(|(keyword, _)| tag.contains(keyword))
            .map_or(Genre::Others, |(_, genre)| *genre)
    }
}

/// Reduce raw tags to a deduplicated category set.
///
/// Categories keep first-seen order. The sentinel is dropped whenever a
/// specific category is also present.
pub fn resolve_categories<S, R>(tags: &[S], reducer: &R) -> Vec<Genre>
where
    S: AsRef<str>,
    R: GenreReducer + ?Sized,
{
    let mut categories: Vec<Genre> = Vec::with_capacity(tags.len());
    for tag in tags {
        let genre = reducer.reduce(tag.as_ref());
        if !categories.contains(&genre) {
            categories.push(genre);
        }
    }
    if categories.len() > 1 {
        categories.retain(|genre| !genre.is_sentinel());
    }
    categories
}

/// Pick the single dominant category by the fixed niche-to-mainstream priority.
///
/// Tag frequency plays no role. An empty set yields the sentinel.
#[must_use]
pub fn dominant_genre(categories: &[Genre]) -> Genre {
    Genre::PRIORITY
        .iter()
        .copied()
        .find(|genre| categories.contains(genre))
        .unwrap_or(Genre::Others)
}
