//! Catalog operations: tiered search, suggestions and related tracks

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::client::CatalogApi;
use crate::error::Result;
use crate::filters::SearchFilters;
use crate::models::{Hit, SearchRequest};
use crate::probe::DurationProbe;
use crate::track::{normalize_all_with_art, Track, DEFAULT_ALBUM_ART};

/// Tunables of the catalog and of the search session built on it
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSettings {
    /// Result bound of the strict and fuzzy passes
    pub search_limit: usize,
    /// Ranking-score floor of the fuzzy pass
    pub fuzzy_threshold: f64,
    /// Size of the un-queried suggestion fetch
    pub suggestion_limit: usize,
    /// Suggestions kept from that fetch
    pub suggestion_sample: usize,
    /// Candidates fetched when the shuffle pool refills
    pub shuffle_pool_limit: usize,
    /// Tracks per shuffle page
    pub shuffle_page_size: usize,
    /// Minimum visible loading time of a query
    pub min_loading: Duration,
    /// Extra delay before reporting an empty result or an error
    pub empty_result_delay: Duration,
    pub default_album_art: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            search_limit: 20,
            fuzzy_threshold: 0.3,
            suggestion_limit: 10,
            suggestion_sample: 3,
            shuffle_pool_limit: 1000,
            shuffle_page_size: 3,
            min_loading: Duration::from_millis(1000),
            empty_result_delay: Duration::from_millis(500),
            default_album_art: DEFAULT_ALBUM_ART.to_string(),
        }
    }
}

/// Search, suggestion and related-track operations over a [`CatalogApi`]
#[derive(Clone)]
pub struct Catalog {
    api: Arc<dyn CatalogApi>,
    probe: Arc<dyn DurationProbe>,
    settings: CatalogSettings,
}

impl Catalog {
    pub fn new(api: Arc<dyn CatalogApi>, probe: Arc<dyn DurationProbe>) -> Self {
        Self::with_settings(api, probe, CatalogSettings::default())
    }

    pub fn with_settings(
        api: Arc<dyn CatalogApi>,
        probe: Arc<dyn DurationProbe>,
        settings: CatalogSettings,
    ) -> Self {
        Self {
            api,
            probe,
            settings,
        }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    pub(crate) async fn normalize(&self, hits: &[Hit]) -> Vec<Track> {
        normalize_all_with_art(hits, self.probe.as_ref(), &self.settings.default_album_art).await
    }

    /// Strict pass first; a fuzzy pass only when the strict pass is empty
    pub async fn search_tracks(&self, query: &str) -> Result<Vec<Track>> {
        let limit = self.settings.search_limit;

        let strict = self.api.search(&SearchRequest::strict(query, limit)).await?;
        if !strict.hits.is_empty() {
            debug!("Strict pass for {:?}: {} hits", query, strict.hits.len());
            return Ok(self.normalize(&strict.hits).await);
        }

        debug!("Strict pass for {:?} is empty, trying fuzzy pass", query);
        let fuzzy = self
            .api
            .search(&SearchRequest::fuzzy(
                query,
                limit,
                self.settings.fuzzy_threshold,
            ))
            .await?;
        debug!("Fuzzy pass for {:?}: {} hits", query, fuzzy.hits.len());
        Ok(self.normalize(&fuzzy.hits).await)
    }

    /// [`search_tracks`](Self::search_tracks) with failures turned into an empty list
    pub async fn search_tracks_or_empty(&self, query: &str) -> Vec<Track> {
        match self.search_tracks(query).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Search for {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }

    /// Tiered search refined by client-side filters
    pub async fn search_filtered(&self, query: &str, filters: &SearchFilters) -> Result<Vec<Track>> {
        let tracks = self.search_tracks(query).await?;
        Ok(filters.apply(tracks))
    }

    /// Random sample of the top of an un-queried listing
    pub async fn suggested_tracks(&self) -> Result<Vec<Track>> {
        let mut rng = StdRng::from_os_rng();
        self.suggested_tracks_with(&mut rng).await
    }

    pub async fn suggested_tracks_with<R: Rng + Send + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Vec<Track>> {
        let response = self
            .api
            .search(&SearchRequest::browse(self.settings.suggestion_limit))
            .await?;

        let mut hits = response.hits;
        hits.shuffle(rng);
        hits.truncate(self.settings.suggestion_sample);
        Ok(self.normalize(&hits).await)
    }

    /// Candidate batch used to refill a shuffle pool
    pub async fn shuffle_candidates(&self) -> Result<Vec<Hit>> {
        let response = self
            .api
            .search(&SearchRequest::browse(self.settings.shuffle_pool_limit))
            .await?;
        Ok(response.hits)
    }

    /// Resolve a track's related-song references
    ///
    /// References are fetched in parallel; individual failures are dropped.
    pub async fn related_tracks(&self, track: &Track) -> Vec<Track> {
        if track.related_songs.is_empty() {
            debug!("No related songs for {:?}", track.title);
            return Vec::new();
        }

        let fetches = track
            .related_songs
            .iter()
            .map(|url| async move { (url, self.api.fetch_hit(url).await) });

        let hits: Vec<Hit> = join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(url, result)| match result {
                Ok(hit) => Some(hit),
                Err(e) => {
                    warn!("Failed to fetch related song {}: {}", url, e);
                    None
                }
            })
            .collect();

        debug!(
            "Resolved {}/{} related songs for {:?}",
            hits.len(),
            track.related_songs.len(),
            track.title
        );
        self.normalize(&hits).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{GenreField, MatchingStrategy, SearchResponse};
    use crate::probe::SkipProbe;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingApi {
        strict: Vec<Hit>,
        fuzzy: Vec<Hit>,
        requests: Mutex<Vec<SearchRequest>>,
    }

    fn hit(id: &str) -> Hit {
        Hit {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[async_trait]
    impl CatalogApi for RecordingApi {
        async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let hits = match request.matching_strategy {
                Some(MatchingStrategy::All) => self.strict.clone(),
                Some(MatchingStrategy::Frequency) => self.fuzzy.clone(),
                None => (0..request.limit.min(10)).map(|i| hit(&i.to_string())).collect(),
            };
            Ok(SearchResponse { hits })
        }

        async fn fetch_hit(&self, url: &str) -> Result<Hit> {
            match url.strip_prefix("ok:") {
                Some(id) => Ok(hit(id)),
                None => Err(Error::status(500, "boom")),
            }
        }
    }

    fn catalog(api: RecordingApi) -> (Catalog, Arc<RecordingApi>) {
        let api = Arc::new(api);
        (Catalog::new(api.clone(), Arc::new(SkipProbe)), api)
    }

    #[tokio::test]
    async fn test_strict_hits_skip_fuzzy() {
        let (catalog, api) = catalog(RecordingApi {
            strict: vec![hit("1")],
            fuzzy: vec![hit("2")],
            ..Default::default()
        });

        let tracks = catalog.search_tracks("jazz").await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "1");
        assert_eq!(api.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_strict_triggers_one_fuzzy() {
        let (catalog, api) = catalog(RecordingApi {
            fuzzy: vec![hit("2")],
            ..Default::default()
        });

        let tracks = catalog.search_tracks("jaz").await.unwrap();
        assert_eq!(tracks[0].id, "2");

        let requests = api.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], SearchRequest::fuzzy("jaz", 20, 0.3));
    }

    #[tokio::test]
    async fn test_filtered_search_refines_fuzzy_results() {
        let tagged = |id: &str, bpm: f64, genre: &str| Hit {
            bpm: Some(bpm),
            genre: Some(GenreField::Text(genre.to_string())),
            ..hit(id)
        };
        let (catalog, api) = catalog(RecordingApi {
            fuzzy: vec![
                tagged("slow", 80.0, "house"),
                tagged("match", 124.0, "deep house, house"),
                tagged("wrong-genre", 122.0, "techno"),
            ],
            ..Default::default()
        });
        let filters = SearchFilters {
            bpm_range: Some("100-130".to_string()),
            genre: vec!["House".to_string()],
            ..Default::default()
        };

        let tracks = catalog.search_filtered("hous", &filters).await.unwrap();
        let ids: Vec<_> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["match"]);
        assert_eq!(api.requests.lock().unwrap().len(), 2);

        let unfiltered = catalog
            .search_filtered("hous", &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(unfiltered.len(), 3);
    }

    #[tokio::test]
    async fn test_suggestions_sample_three_of_ten() {
        let (catalog, api) = catalog(RecordingApi::default());
        let mut rng = StdRng::seed_from_u64(7);

        let tracks = catalog.suggested_tracks_with(&mut rng).await.unwrap();
        assert_eq!(tracks.len(), 3);
        assert_eq!(api.requests.lock().unwrap()[0], SearchRequest::browse(10));

        let mut ids: Vec<_> = tracks.iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_related_drops_failures() {
        let (catalog, _) = catalog(RecordingApi::default());
        let mut track = Track::from_hit(&Hit::default(), 0.0);
        track.related_songs = vec!["ok:a".into(), "bad".into(), "ok:c".into()];

        let related = catalog.related_tracks(&track).await;
        let ids: Vec<_> = related.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_related_without_references_is_empty() {
        let (catalog, _) = catalog(RecordingApi::default());
        let track = Track::from_hit(&Hit::default(), 0.0);
        assert!(catalog.related_tracks(&track).await.is_empty());
    }
}
