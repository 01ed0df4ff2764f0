//! Track model and hit normalization
//!
//! [`Track`] is the renderable form of a catalog entry. Every field has a
//! deterministic fallback so a track built from a partial [`Hit`] can always be
//! displayed.

use std::fmt;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::models::Hit;
use crate::probe::{probe_or_zero, DurationProbe};

/// Placeholder used when a hit carries no album art
pub const DEFAULT_ALBUM_ART: &str = "/images/default-album-art.png";

/// Emotional tone derived from the hit's happiness and sadness scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
}

impl Mood {
    /// `Happy` only when the happiness score is strictly greater.
    ///
    /// Equal scores and missing scores give `Sad`.
    pub fn from_scores(happy: Option<f64>, sad: Option<f64>) -> Self {
        if happy.unwrap_or(0.0) > sad.unwrap_or(0.0) {
            Mood::Happy
        } else {
            Mood::Sad
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A renderable catalog track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Catalog-assigned identity, empty when the hit had none
    pub id: String,
    pub slug: String,
    pub title: String,
    pub artist: String,
    pub album_art: String,
    pub bpm: f64,
    pub mood: Mood,
    /// Key and scale joined by a space, or `"Unknown"`
    pub key: String,
    /// Genres joined by `", "`, or `"Unknown"`
    pub genre: String,
    /// 0..1
    pub energy: f64,
    /// 0..1
    #[serde(default)]
    pub danceability: f64,
    pub audio_url: String,
    /// Seconds, 0 when unknown
    pub duration: f64,
    /// Present in the local offline store
    pub cached: bool,
    #[serde(rename = "related_songs", default)]
    pub related_songs: Vec<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn unit_interval(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0).clamp(0.0, 1.0)
}

impl Track {
    /// Map a raw hit to a track using the default album art placeholder
    pub fn from_hit(hit: &Hit, duration: f64) -> Self {
        Self::from_hit_with_art(hit, duration, DEFAULT_ALBUM_ART)
    }

    /// Map a raw hit to a track, substituting `default_art` for missing art
    pub fn from_hit_with_art(hit: &Hit, duration: f64, default_art: &str) -> Self {
        let key = [non_empty(&hit.key), non_empty(&hit.scale)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        let genres = hit.genre.as_ref().map(|g| g.names()).unwrap_or_default();

        Self {
            id: hit.id.clone().unwrap_or_default(),
            slug: non_empty(&hit.slug).unwrap_or_default().to_string(),
            title: non_empty(&hit.title).unwrap_or("Untitled").to_string(),
            artist: non_empty(&hit.author).unwrap_or("Unknown Artist").to_string(),
            album_art: non_empty(&hit.image).unwrap_or(default_art).to_string(),
            bpm: hit.bpm.unwrap_or(0.0).max(0.0),
            mood: Mood::from_scores(hit.happy, hit.sad),
            key: if key.is_empty() { "Unknown".to_string() } else { key },
            genre: if genres.is_empty() {
                "Unknown".to_string()
            } else {
                genres.join(", ")
            },
            energy: unit_interval(hit.energy),
            danceability: unit_interval(hit.danceability),
            audio_url: non_empty(&hit.path).unwrap_or_default().to_string(),
            duration: if duration.is_finite() && duration > 0.0 {
                duration
            } else {
                0.0
            },
            cached: false,
            related_songs: hit
                .related_songs
                .as_ref()
                .map(|r| r.references())
                .unwrap_or_default(),
        }
    }

    /// Genre names as a list, empty for `"Unknown"`
    pub fn genres(&self) -> Vec<&str> {
        if self.genre == "Unknown" {
            return Vec::new();
        }
        self.genre.split(", ").filter(|g| !g.is_empty()).collect()
    }

    pub fn has_related(&self) -> bool {
        !self.related_songs.is_empty()
    }
}

/// Normalize one hit, probing its audio source for a duration
pub async fn normalize(hit: &Hit, probe: &dyn DurationProbe) -> Track {
    normalize_with_art(hit, probe, DEFAULT_ALBUM_ART).await
}

/// Normalize hits concurrently; output order follows input order
pub async fn normalize_all(hits: &[Hit], probe: &dyn DurationProbe) -> Vec<Track> {
    normalize_all_with_art(hits, probe, DEFAULT_ALBUM_ART).await
}

pub(crate) async fn normalize_with_art(
    hit: &Hit,
    probe: &dyn DurationProbe,
    default_art: &str,
) -> Track {
    let url = hit.path.as_deref().unwrap_or_default();
    let duration = probe_or_zero(probe, url).await;
    Track::from_hit_with_art(hit, duration, default_art)
}

pub(crate) async fn normalize_all_with_art(
    hits: &[Hit],
    probe: &dyn DurationProbe,
    default_art: &str,
) -> Vec<Track> {
    join_all(
        hits.iter()
            .map(|hit| normalize_with_art(hit, probe, default_art)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenreField, RelatedField};
    use crate::probe::SkipProbe;

    fn scored(happy: f64, sad: f64) -> Hit {
        Hit {
            happy: Some(happy),
            sad: Some(sad),
            ..Default::default()
        }
    }

    #[test]
    fn test_mood_from_scores() {
        assert_eq!(Track::from_hit(&scored(0.6, 0.4), 0.0).mood, Mood::Happy);
        assert_eq!(Track::from_hit(&scored(0.4, 0.6), 0.0).mood, Mood::Sad);
        // equal scores resolve to sad
        assert_eq!(Track::from_hit(&scored(0.5, 0.5), 0.0).mood, Mood::Sad);
        assert_eq!(Mood::from_scores(None, None), Mood::Sad);
        assert_eq!(Mood::from_scores(Some(0.1), None), Mood::Happy);
    }

    #[test]
    fn test_empty_hit_gets_fallbacks() {
        let track = Track::from_hit(&Hit::default(), 0.0);

        assert_eq!(track.id, "");
        assert_eq!(track.slug, "");
        assert_eq!(track.title, "Untitled");
        assert_eq!(track.artist, "Unknown Artist");
        assert_eq!(track.album_art, DEFAULT_ALBUM_ART);
        assert_eq!(track.key, "Unknown");
        assert_eq!(track.genre, "Unknown");
        assert_eq!(track.bpm, 0.0);
        assert_eq!(track.energy, 0.0);
        assert_eq!(track.audio_url, "");
        assert_eq!(track.duration, 0.0);
        assert!(!track.cached);
        assert!(track.related_songs.is_empty());
    }

    #[test]
    fn test_blank_strings_are_absent() {
        let hit = Hit {
            title: Some("  ".to_string()),
            author: Some(String::new()),
            image: Some(String::new()),
            ..Default::default()
        };
        let track = Track::from_hit(&hit, 0.0);
        assert_eq!(track.title, "Untitled");
        assert_eq!(track.artist, "Unknown Artist");
        assert_eq!(track.album_art, DEFAULT_ALBUM_ART);
    }

    #[test]
    fn test_full_hit_mapping() {
        let hit = Hit {
            id: Some("17".to_string()),
            slug: Some("night-drive".to_string()),
            title: Some("Night Drive".to_string()),
            author: Some("Neon".to_string()),
            bpm: Some(118.0),
            key: Some("C#".to_string()),
            scale: Some("minor".to_string()),
            energy: Some(1.4),
            happy: Some(0.7),
            sad: Some(0.2),
            danceability: Some(0.5),
            path: Some("https://cdn/a.mp3".to_string()),
            image: Some("https://cdn/a.jpg".to_string()),
            genre: Some(GenreField::List(vec![
                "synthwave".to_string(),
                " retro ".to_string(),
            ])),
            related_songs: Some(RelatedField::List(vec!["https://x/1".to_string()])),
        };

        let track = Track::from_hit(&hit, 213.4);
        assert_eq!(track.id, "17");
        assert_eq!(track.key, "C# minor");
        assert_eq!(track.genre, "synthwave, retro");
        assert_eq!(track.genres(), vec!["synthwave", "retro"]);
        assert_eq!(track.energy, 1.0);
        assert_eq!(track.mood, Mood::Happy);
        assert_eq!(track.duration, 213.4);
        assert_eq!(track.related_songs, vec!["https://x/1".to_string()]);
    }

    #[test]
    fn test_key_without_scale() {
        let hit = Hit {
            scale: Some("major".to_string()),
            ..Default::default()
        };
        assert_eq!(Track::from_hit(&hit, 0.0).key, "major");
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(Track::from_hit(&Hit::default(), 0.0)).unwrap();
        assert!(value.get("albumArt").is_some());
        assert!(value.get("audioUrl").is_some());
        assert!(value.get("related_songs").is_some());
        assert_eq!(value["mood"], "sad");
    }

    #[tokio::test]
    async fn test_normalize_all_preserves_order() {
        let hits: Vec<Hit> = (1..=5)
            .map(|i| Hit {
                id: Some(i.to_string()),
                ..Default::default()
            })
            .collect();

        let tracks = normalize_all(&hits, &SkipProbe).await;
        let ids: Vec<_> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    }
}
