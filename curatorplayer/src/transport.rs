//! Single-resource audio transport
//!
//! [`AudioTransport`] owns at most one loaded [`Sound`]. Starting a new track
//! always releases the previous resource first. Observers are notified only
//! from the events of the active sound, so every published state reflects
//! something the resource actually did.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use curatorcatalog::Track;
use serde::Serialize;
use tracing::{debug, warn};

use crate::resolver::SourceResolver;
use crate::sound::{EventSink, Sound, SoundEvent, SoundFactory};
use crate::store::PlaybackPosition;

/// Snapshot of the transport
///
/// `position`, `duration` and `track` are only present while a track is
/// loaded; `playing` is false whenever `track` is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AudioPlayerState {
    pub playing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<Track>,
}

type Observer = Arc<dyn Fn(&AudioPlayerState) + Send + Sync>;

struct Active {
    token: u64,
    track: Track,
    sound: Arc<dyn Sound>,
}

struct Inner {
    resolver: SourceResolver,
    factory: Arc<dyn SoundFactory>,
    /// Token of the latest `play` request
    play_token: AtomicU64,
    active: Mutex<Option<Active>>,
    volume: Mutex<f32>,
    observers: Mutex<Vec<(u64, Observer)>>,
    next_observer: AtomicU64,
}

impl Inner {
    fn current(&self) -> Option<(Track, Arc<dyn Sound>)> {
        let active = self.active.lock().unwrap();
        active
            .as_ref()
            .map(|a| (a.track.clone(), Arc::clone(&a.sound)))
    }

    fn snapshot(&self) -> AudioPlayerState {
        match self.current() {
            None => AudioPlayerState::default(),
            Some((track, sound)) => {
                let duration = sound.duration();
                let mut position = sound.position().max(0.0);
                if let Some(d) = duration {
                    position = position.min(d);
                }
                AudioPlayerState {
                    playing: sound.is_playing(),
                    position: Some(position),
                    duration,
                    track: Some(track),
                }
            }
        }
    }

    fn on_event(&self, token: u64, event: SoundEvent) {
        let is_active = self
            .active
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|a| a.token == token);
        if !is_active {
            debug!("Ignoring {} event from a released sound", event);
            return;
        }
        self.publish();
    }

    fn publish(&self) {
        let state = self.snapshot();
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        for observer in observers {
            observer(&state);
        }
    }

    /// Release the active sound, if any
    fn release(&self) {
        let previous = self.active.lock().unwrap().take();
        if let Some(previous) = previous {
            debug!("Releasing sound of {}", previous.track.id);
            previous.sound.unload();
        }
    }
}

/// Handle returned by [`AudioTransport::subscribe`]
///
/// Dropping the handle keeps the observer registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.observers.lock().unwrap().retain(|(id, _)| *id != self.id);
        }
    }
}

/// The single playback service of an application
///
/// Clones share the same transport.
#[derive(Clone)]
pub struct AudioTransport {
    inner: Arc<Inner>,
}

impl AudioTransport {
    pub fn new(resolver: SourceResolver, factory: Arc<dyn SoundFactory>) -> Self {
        Self {
            inner: Arc::new(Inner {
                resolver,
                factory,
                play_token: AtomicU64::new(0),
                active: Mutex::new(None),
                volume: Mutex::new(1.0),
                observers: Mutex::new(Vec::new()),
                next_observer: AtomicU64::new(0),
            }),
        }
    }

    /// Load and start `track`
    ///
    /// Failures are logged and leave nothing loaded. When another `play`
    /// starts before this one has loaded, this one is abandoned.
    pub async fn play(&self, track: &Track) {
        let inner = &self.inner;
        let token = inner.play_token.fetch_add(1, Ordering::SeqCst) + 1;

        inner.release();

        let source = inner.resolver.resolve(track);
        if let Err(e) = inner.resolver.verify(&source).await {
            warn!("Cannot play {:?}: {}", track.title, e);
            return;
        }
        if inner.play_token.load(Ordering::SeqCst) != token {
            debug!("Play request for {} superseded before loading", track.id);
            return;
        }

        let weak = Arc::downgrade(inner);
        let events: EventSink = Arc::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_event(token, event);
            }
        });

        let sound: Arc<dyn Sound> = match inner.factory.load(&source, events).await {
            Ok(sound) => Arc::from(sound),
            Err(e) => {
                warn!("Failed to load {}: {}", source.uri(), e);
                return;
            }
        };
        sound.set_volume(*inner.volume.lock().unwrap());

        {
            let mut active = inner.active.lock().unwrap();
            if inner.play_token.load(Ordering::SeqCst) != token {
                drop(active);
                debug!("Play request for {} superseded while loading", track.id);
                sound.unload();
                return;
            }
            *active = Some(Active {
                token,
                track: track.clone(),
                sound: Arc::clone(&sound),
            });
        }

        debug!("Playing {} from {}", track.id, source.uri());
        sound.play();
    }

    /// Pause and remember the position of the current track
    pub fn pause(&self) {
        let Some((track, sound)) = self.inner.current() else {
            return;
        };
        sound.pause();

        if track.id.is_empty() {
            return;
        }
        let position = PlaybackPosition::now(track.id.clone(), sound.position());
        if let Err(e) = self.inner.resolver.store().save_playback(&position) {
            warn!("Failed to save playback position of {}: {}", track.id, e);
        }
    }

    pub fn resume(&self) {
        if let Some((_, sound)) = self.inner.current() {
            sound.play();
        }
    }

    /// Seek the current track; clamping is left to the sound
    pub fn seek(&self, position: f64) {
        if let Some((_, sound)) = self.inner.current() {
            sound.seek(position);
        }
    }

    /// Stop and rewind the current track, keeping it loaded
    pub fn stop(&self) {
        if let Some((_, sound)) = self.inner.current() {
            sound.stop();
        }
    }

    /// Set the volume of the current and future sounds, clamped to 0..1
    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        *self.inner.volume.lock().unwrap() = volume;
        if let Some((_, sound)) = self.inner.current() {
            sound.set_volume(volume);
        }
    }

    pub fn volume(&self) -> f32 {
        *self.inner.volume.lock().unwrap()
    }

    pub fn current_state(&self) -> AudioPlayerState {
        self.inner.snapshot()
    }

    /// Register an observer of future state changes
    ///
    /// The observer is not called with the current state; use
    /// [`current_state`](Self::current_state) for that.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&AudioPlayerState) + Send + Sync + 'static,
    {
        let id = self.inner.next_observer.fetch_add(1, Ordering::SeqCst);
        self.inner
            .observers
            .lock()
            .unwrap()
            .push((id, Arc::new(observer)));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.observers.lock().unwrap().len()
    }
}
