//! # curatorcatalog - Curator music catalog client
//!
//! Search, suggestions, shuffle paging and related-track resolution against
//! the Curator search index.
//!
//! ## Overview
//!
//! - [`CuratorClient`] talks to the search endpoint (bearer-authenticated
//!   `POST` of a [`SearchRequest`]) and implements [`CatalogApi`].
//! - [`Catalog`] turns raw [`Hit`]s into renderable [`Track`]s and runs the
//!   two-tier search: a strict pass where every term must match, then a
//!   single fuzzy pass when the strict one comes back empty.
//! - [`ShufflePool`] pages through a shuffled copy of the catalog.
//! - [`SearchSession`] is the state machine a UI observes: loading floors,
//!   empty-result fallback to suggestions, error strings, stale-result guard.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use curatorcatalog::{Catalog, CuratorClient, HttpDurationProbe, SearchSession};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CuratorClient::new()?;
//! let probe = HttpDurationProbe::with_client(client.http().clone());
//! let catalog = Catalog::new(Arc::new(client), Arc::new(probe));
//!
//! let session = SearchSession::new(catalog);
//! session.set_query("deep house").await;
//! for track in session.state().tracks {
//!     println!("{} - {} ({})", track.artist, track.title, track.mood);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod client;
pub mod error;
pub mod filters;
pub mod models;
pub mod probe;
pub mod session;
pub mod shuffle;
pub mod track;

#[cfg(feature = "curatorconfig")]
pub mod config_ext;

pub use catalog::{Catalog, CatalogSettings};
pub use client::{CatalogApi, ClientBuilder, CuratorClient};
pub use error::{Error, Result};
pub use filters::SearchFilters;
pub use models::{Hit, MatchingStrategy, SearchRequest, SearchResponse};
pub use probe::{probe_or_zero, DurationProbe, HttpDurationProbe, SkipProbe, PROBE_WINDOW_BYTES};
pub use session::{Notice, SearchQueryState, SearchSession};
pub use shuffle::ShufflePool;
pub use track::{normalize, normalize_all, Mood, Track, DEFAULT_ALBUM_ART};

#[cfg(feature = "curatorconfig")]
pub use config_ext::CatalogConfigExt;
