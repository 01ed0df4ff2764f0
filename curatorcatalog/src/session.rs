//! Search query state machine
//!
//! A [`SearchSession`] drives queries, shuffles and related-track lookups and
//! publishes a [`SearchQueryState`] through a `tokio::sync::watch` channel.
//! Each action captures a liveness token when it starts; starting another
//! action or calling [`SearchSession::cancel`] revokes it, and a task holding
//! a revoked token never touches the shared state again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::{watch, Mutex};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::shuffle::ShufflePool;
use crate::track::Track;

/// Transient user notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    /// Shown when a query matched nothing and suggestions replace it
    pub fn nothing_here() -> Self {
        Self {
            title: "Oops! Nothing here".to_string(),
            description: "Try our Suggested Tracks".to_string(),
        }
    }
}

/// Snapshot of the query, its progress and its results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQueryState {
    pub query: String,
    pub loading: bool,
    pub error: Option<String>,
    pub tracks: Vec<Track>,
    pub notice: Option<Notice>,
}

#[derive(Debug, Default)]
struct Liveness {
    generation: Arc<AtomicU64>,
}

impl Liveness {
    /// Revoke the current token and hand out a new one
    fn begin(&self) -> LiveToken {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        LiveToken {
            generation,
            current: Arc::clone(&self.generation),
        }
    }

    fn revoke(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct LiveToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl LiveToken {
    fn is_live(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

/// Search, shuffle and related-track front end over a [`Catalog`]
pub struct SearchSession<R: Rng = StdRng> {
    catalog: Catalog,
    pool: Mutex<ShufflePool<R>>,
    state: watch::Sender<SearchQueryState>,
    liveness: Liveness,
}

impl SearchSession<StdRng> {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_pool(catalog, ShufflePool::new())
    }
}

impl<R: Rng + Send> SearchSession<R> {
    pub fn with_pool(catalog: Catalog, pool: ShufflePool<R>) -> Self {
        let (state, _) = watch::channel(SearchQueryState::default());
        Self {
            catalog,
            pool: Mutex::new(pool),
            state,
            liveness: Liveness::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchQueryState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SearchQueryState {
        self.state.borrow().clone()
    }

    /// Drop the results of every in-flight action
    pub fn cancel(&self) {
        debug!("Search session cancelled");
        self.liveness.revoke();
    }

    /// Apply `f` to the state unless `token` has been revoked
    fn update(&self, token: &LiveToken, f: impl FnOnce(&mut SearchQueryState)) -> bool {
        self.state.send_if_modified(|state| {
            if !token.is_live() {
                return false;
            }
            f(state);
            true
        })
    }

    /// Run a query; a blank query loads suggestions instead
    pub async fn set_query(&self, query: &str) {
        let token = self.liveness.begin();
        let trimmed = query.trim().to_string();

        self.update(&token, |s| {
            s.query = query.to_string();
            s.error = None;
            s.notice = None;
        });

        if trimmed.is_empty() {
            self.load_suggestions(&token).await;
            return;
        }

        self.update(&token, |s| s.loading = true);

        let settings = self.catalog.settings().clone();
        let (result, _) = tokio::join!(
            self.catalog.search_tracks(&trimmed),
            sleep(settings.min_loading)
        );

        match result {
            Ok(tracks) if !tracks.is_empty() => {
                self.update(&token, |s| s.tracks = tracks);
            }
            Ok(_) => {
                sleep(settings.empty_result_delay).await;
                let live = self.update(&token, |s| {
                    s.notice = Some(Notice::nothing_here());
                    s.query.clear();
                });
                if live {
                    debug!("No results for {:?}, falling back to suggestions", trimmed);
                    self.load_suggestions(&token).await;
                }
            }
            Err(e) => {
                warn!("Search for {:?} failed: {}", trimmed, e);
                sleep(settings.empty_result_delay).await;
                self.update(&token, |s| {
                    s.error = Some(format!("Search failed: {e}. Please try again."));
                    s.tracks.clear();
                });
            }
        }

        self.update(&token, |s| s.loading = false);
    }

    async fn load_suggestions(&self, token: &LiveToken) {
        self.update(token, |s| s.loading = true);

        match self.catalog.suggested_tracks().await {
            Ok(tracks) if !tracks.is_empty() => {
                self.update(token, |s| s.tracks = tracks);
            }
            Ok(_) => debug!("Suggestion listing is empty"),
            Err(e) => {
                warn!("Failed to load suggestions: {}", e);
                self.update(token, |s| {
                    s.error = Some(format!("Failed to load initial tracks: {e}"));
                    s.tracks.clear();
                });
            }
        }

        self.update(token, |s| s.loading = false);
    }

    /// Replace the results with the next shuffle page
    pub async fn shuffle(&self) {
        let token = self.liveness.begin();
        self.update(&token, |s| {
            s.loading = true;
            s.error = None;
            s.notice = None;
        });

        let result = {
            let mut pool = self.pool.lock().await;
            pool.next_page(&self.catalog).await
        };

        match result {
            Ok(tracks) => {
                self.update(&token, |s| s.tracks = tracks);
            }
            Err(e) => {
                warn!("Shuffle failed: {}", e);
                self.update(&token, |s| {
                    s.error = Some(format!("Failed to shuffle tracks: {e}"));
                    s.tracks.clear();
                });
            }
        }

        self.update(&token, |s| s.loading = false);
    }

    /// Replace the results with the tracks related to `track`
    pub async fn fetch_related(&self, track: &Track) {
        let token = self.liveness.begin();
        self.update(&token, |s| {
            s.loading = true;
            s.error = None;
            s.notice = None;
        });

        if !track.has_related() {
            self.update(&token, |s| {
                s.error = Some(format!("No related tracks found for \"{}\"", track.title));
                s.loading = false;
            });
            return;
        }

        let related = self.catalog.related_tracks(track).await;
        self.update(&token, |s| {
            if related.is_empty() {
                s.error = Some(format!(
                    "No related tracks could be loaded for \"{}\"",
                    track.title
                ));
            }
            s.tracks = related;
            s.loading = false;
        });
    }
}
