//! Client-side refinement of search results

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::track::{Mood, Track};

/// Optional constraints applied to normalized tracks
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchFilters {
    /// Exact tempo, compared after rounding
    pub bpm: Option<f64>,
    /// Inclusive tempo range written `"lo-hi"`, e.g. `"90-120"`
    pub bpm_range: Option<String>,
    pub mood: Option<Mood>,
    /// Key prefix, case-insensitive: `"C#"` matches `"C# minor"`
    pub key: Option<String>,
    /// Any-of genre match, case-insensitive
    pub genre: Vec<String>,
    /// Minimum energy
    pub energy: Option<f64>,
}

/// Parse a `"lo-hi"` tempo range; bounds may be given in either order
pub fn parse_bpm_range(range: &str) -> Option<(f64, f64)> {
    let (lo, hi) = range.split_once('-')?;
    let lo: f64 = lo.trim().parse().ok()?;
    let hi: f64 = hi.trim().parse().ok()?;
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    Some((lo.min(hi), lo.max(hi)))
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, track: &Track) -> bool {
        if let Some(bpm) = self.bpm {
            if track.bpm.round() != bpm.round() {
                return false;
            }
        }

        if let Some(range) = self.bpm_range.as_deref() {
            match parse_bpm_range(range) {
                Some((lo, hi)) if track.bpm < lo || track.bpm > hi => return false,
                Some(_) => {}
                None => warn!("Ignoring malformed bpm range {:?}", range),
            }
        }

        if let Some(mood) = self.mood {
            if track.mood != mood {
                return false;
            }
        }

        if let Some(key) = self.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            if !track.key.to_lowercase().starts_with(&key.to_lowercase()) {
                return false;
            }
        }

        if !self.genre.is_empty() {
            let genres = track.genres();
            let hit = self.genre.iter().any(|wanted| {
                genres
                    .iter()
                    .any(|g| g.eq_ignore_ascii_case(wanted.trim()))
            });
            if !hit {
                return false;
            }
        }

        if let Some(energy) = self.energy {
            if track.energy < energy {
                return false;
            }
        }

        true
    }

    /// Keep the tracks that satisfy every set constraint, in order
    pub fn apply(&self, tracks: Vec<Track>) -> Vec<Track> {
        if self.is_empty() {
            return tracks;
        }
        tracks.into_iter().filter(|t| self.matches(t)).collect()
    }
}
