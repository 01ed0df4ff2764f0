//! Playable sound resources

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::resolver::AudioSource;

/// Lifecycle event fired by a sound after its state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEvent {
    Play,
    Pause,
    Stop,
    End,
    Seek,
}

impl fmt::Display for SoundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SoundEvent::Play => "play",
            SoundEvent::Pause => "pause",
            SoundEvent::Stop => "stop",
            SoundEvent::End => "end",
            SoundEvent::Seek => "seek",
        };
        f.write_str(name)
    }
}

/// Callback receiving the events of one sound
pub type EventSink = Arc<dyn Fn(SoundEvent) + Send + Sync>;

/// One loaded, playable audio resource
///
/// Implementations fire the matching [`SoundEvent`] through their
/// [`EventSink`] once a state change has taken effect, so that observers
/// reading the sound from the callback see the new state. Methods must not
/// block on the event sink's consumers.
pub trait Sound: Send + Sync {
    /// Start or resume; fires [`SoundEvent::Play`]
    fn play(&self);

    /// Fires [`SoundEvent::Pause`]
    fn pause(&self);

    /// Stop and rewind; fires [`SoundEvent::Stop`]
    fn stop(&self);

    /// Move to `position` seconds, clamped to the sound; fires [`SoundEvent::Seek`]
    fn seek(&self, position: f64);

    fn is_playing(&self) -> bool;

    /// Seconds from the start
    fn position(&self) -> f64;

    /// Seconds, `None` until known
    fn duration(&self) -> Option<f64>;

    /// 0..1
    fn set_volume(&self, volume: f32);

    fn volume(&self) -> f32;

    /// Release the resource; fires nothing and later calls are no-ops
    fn unload(&self);
}

/// Builds sounds bound to an event sink
#[async_trait]
pub trait SoundFactory: Send + Sync {
    async fn load(&self, source: &AudioSource, events: EventSink) -> Result<Box<dyn Sound>>;
}
