//! Wire models for the Curator search endpoint
//!
//! The search service is a Meilisearch-style index: a `POST` with a JSON
//! [`SearchRequest`] returns a [`SearchResponse`] holding raw [`Hit`]s. Hits
//! are produced by an analysis pipeline and are frequently incomplete, so every
//! field is optional and the deserializers accept the loose shapes seen in
//! practice (numbers as strings, lists as comma-separated strings).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Deserialize an optional string or number into `Option<String>`
///
/// Any other JSON type is treated as absent.
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s).filter(|s| !s.is_empty()),
        // A zero id is what the analysis pipeline emits for unsaved rows
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().map(|f| f.to_string()),
        },
        _ => None,
    })
}

/// Deserialize an optional string or number into `Option<f64>`
fn deserialize_optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()),
        _ => None,
    })
}

/// Deserialize a text field; numbers are kept as their decimal text, other
/// JSON types are treated as absent
fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Keep the string elements of a JSON array
fn string_items(items: Vec<Value>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

fn deserialize_genre<'de, D>(deserializer: D) -> Result<Option<GenreField>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(GenreField::List(string_items(items))),
        Some(Value::String(s)) => Some(GenreField::Text(s)),
        _ => None,
    })
}

fn deserialize_related<'de, D>(deserializer: D) -> Result<Option<RelatedField>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(RelatedField::List(string_items(items))),
        Some(Value::String(s)) => Some(RelatedField::Text(s)),
        _ => None,
    })
}

/// Deserialize the `hits` array one element at a time, dropping the elements
/// that are not hit objects
fn deserialize_hits<'de, D>(deserializer: D) -> Result<Vec<Hit>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    let total = raw.len();
    let hits: Vec<Hit> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<Hit>(value) {
            Ok(hit) => Some(hit),
            Err(e) => {
                warn!("Dropping malformed hit #{}: {}", index, e);
                None
            }
        })
        .collect();
    if hits.len() < total {
        warn!("Kept {}/{} hits of the search response", hits.len(), total);
    }
    Ok(hits)
}

/// Genre as sent by the index: either a list or a comma-separated string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenreField {
    List(Vec<String>),
    Text(String),
}

impl GenreField {
    /// Returns the trimmed, non-empty genre names
    pub fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            GenreField::List(items) => items.iter().map(String::as_str).collect(),
            GenreField::Text(text) => text.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// References to related songs: a list, a JSON-encoded list, or a
/// comma-separated string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelatedField {
    List(Vec<String>),
    Text(String),
}

impl RelatedField {
    /// Returns the ordered, non-empty references
    pub fn references(&self) -> Vec<String> {
        let items: Vec<String> = match self {
            RelatedField::List(items) => items.clone(),
            RelatedField::Text(text) => {
                let trimmed = text.trim();
                if trimmed.starts_with('[') {
                    serde_json::from_str::<Vec<String>>(trimmed).unwrap_or_default()
                } else {
                    trimmed.split(',').map(str::to_string).collect()
                }
            }
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// One raw result record returned by the search endpoint
///
/// Related-song references resolve to the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hit {
    #[serde(deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub slug: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub title: Option<String>,
    /// Artist name
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub author: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_f64")]
    pub bpm: Option<f64>,
    /// Musical key, e.g. `"C#"`
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub key: Option<String>,
    /// Scale, e.g. `"minor"`
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub scale: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_f64")]
    pub energy: Option<f64>,
    #[serde(deserialize_with = "deserialize_optional_f64")]
    pub happy: Option<f64>,
    #[serde(deserialize_with = "deserialize_optional_f64")]
    pub sad: Option<f64>,
    #[serde(deserialize_with = "deserialize_optional_f64")]
    pub danceability: Option<f64>,
    /// Audio source URI
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub path: Option<String>,
    /// Album art URI
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub image: Option<String>,
    #[serde(deserialize_with = "deserialize_genre")]
    pub genre: Option<GenreField>,
    #[serde(deserialize_with = "deserialize_related")]
    pub related_songs: Option<RelatedField>,
}

/// Term-matching leniency of a search pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingStrategy {
    /// Every query term must match
    All,
    /// Frequency-based scoring, admits partial matches
    Frequency,
}

/// Body of a search request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub q: String,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_strategy: Option<MatchingStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_matches_position: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_score_threshold: Option<f64>,
}

impl SearchRequest {
    /// Strict pass: all terms must match
    pub fn strict(q: impl Into<String>, limit: usize) -> Self {
        Self {
            q: q.into(),
            limit,
            matching_strategy: Some(MatchingStrategy::All),
            show_matches_position: None,
            ranking_score_threshold: None,
        }
    }

    /// Fuzzy pass: frequency matching with a ranking-score floor
    pub fn fuzzy(q: impl Into<String>, limit: usize, threshold: f64) -> Self {
        Self {
            q: q.into(),
            limit,
            matching_strategy: Some(MatchingStrategy::Frequency),
            show_matches_position: Some(true),
            ranking_score_threshold: Some(threshold),
        }
    }

    /// Un-queried listing of the catalog
    pub fn browse(limit: usize) -> Self {
        Self {
            q: String::new(),
            limit,
            matching_strategy: None,
            show_matches_position: None,
            ranking_score_threshold: None,
        }
    }
}

/// Response of the search endpoint
///
/// A body without a `hits` array is malformed and fails to deserialize.
/// Elements of `hits` that are not objects are dropped with a warning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(deserialize_with = "deserialize_hits")]
    pub hits: Vec<Hit>,
}
