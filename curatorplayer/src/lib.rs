//! # curatorplayer - playback for Curator
//!
//! - [`TrackStore`] records tracks available offline and playback positions
//!   ([`SqliteTrackStore`], [`MemoryTrackStore`]).
//! - [`SourceResolver`] picks the offline copy of a track over its remote URL
//!   and checks that the chosen source can be opened.
//! - [`AudioTransport`] owns the one active [`Sound`], exposes transport
//!   controls and multicasts [`AudioPlayerState`] to subscribers.
//!
//! Sounds come from a [`SoundFactory`]. With the `rodio` feature,
//! `RodioSoundFactory` plays through the default output device.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use curatorplayer::{AudioTransport, SourceResolver, SqliteTrackStore};
//! # use curatorplayer::SoundFactory;
//! # fn factory() -> Arc<dyn SoundFactory> { unimplemented!() }
//!
//! # async fn demo(track: curatorcatalog::Track) -> curatorplayer::Result<()> {
//! let store = Arc::new(SqliteTrackStore::open(Path::new("tracks.db"))?);
//! let transport = AudioTransport::new(SourceResolver::new(store)?, factory());
//!
//! let subscription = transport.subscribe(|state| {
//!     println!("playing={} position={:?}", state.playing, state.position);
//! });
//! transport.play(&track).await;
//! transport.pause();
//! subscription.unsubscribe();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod resolver;
pub mod sound;
pub mod store;
pub mod transport;

#[cfg(feature = "rodio")]
pub mod rodio_backend;

#[cfg(feature = "curatorconfig")]
pub mod config_ext;

pub use error::{Error, Result};
pub use resolver::{AudioSource, SourceResolver};
pub use sound::{EventSink, Sound, SoundEvent, SoundFactory};
pub use store::{MemoryTrackStore, PlaybackPosition, SqliteTrackStore, StoredTrack, TrackStore};
pub use transport::{AudioPlayerState, AudioTransport, Subscription};

#[cfg(feature = "rodio")]
pub use rodio_backend::RodioSoundFactory;

#[cfg(feature = "curatorconfig")]
pub use config_ext::{PlayerConfigExt, TRACK_STORE_FILE};
