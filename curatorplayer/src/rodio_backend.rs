//! Sound resources played through the default output device
//!
//! The output stream lives on a dedicated thread for the lifetime of the
//! factory; sinks created there are driven directly from the sounds.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rodio::{Decoder, OutputStreamBuilder, Sink, Source};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::resolver::AudioSource;
use crate::sound::{EventSink, Sound, SoundEvent, SoundFactory};

/// How often a playing sound is checked for having run out
const END_POLL_INTERVAL: Duration = Duration::from_millis(250);

enum AudioCmd {
    NewSink(oneshot::Sender<Sink>),
}

fn spawn_output_thread(rx: Receiver<AudioCmd>) {
    thread::spawn(move || {
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => stream,
            Err(e) => {
                warn!("No audio output device: {}", e);
                return;
            }
        };
        stream.log_on_drop(false);

        while let Ok(cmd) = rx.recv() {
            match cmd {
                AudioCmd::NewSink(reply) => {
                    let _ = reply.send(Sink::connect_new(stream.mixer()));
                }
            }
        }
        debug!("Audio output thread finished");
    });
}

/// [`SoundFactory`] backed by rodio
pub struct RodioSoundFactory {
    commands: Mutex<Sender<AudioCmd>>,
    client: Client,
}

impl RodioSoundFactory {
    pub fn new(client: Client) -> Self {
        let (tx, rx) = mpsc::channel();
        spawn_output_thread(rx);
        Self {
            commands: Mutex::new(tx),
            client,
        }
    }

    async fn new_sink(&self) -> Result<Sink> {
        let (reply, sink) = oneshot::channel();
        self.commands
            .lock()
            .unwrap()
            .send(AudioCmd::NewSink(reply))
            .map_err(|_| Error::sound("audio output is unavailable"))?;
        sink.await
            .map_err(|_| Error::sound("audio output is unavailable"))
    }

    async fn read(&self, source: &AudioSource) -> Result<Vec<u8>> {
        match source {
            AudioSource::Remote { url } => {
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(Error::unreachable(url, status.to_string()));
                }
                Ok(response.bytes().await?.to_vec())
            }
            AudioSource::Cached { path, .. } => Ok(tokio::fs::read(path).await?),
        }
    }
}

#[async_trait]
impl SoundFactory for RodioSoundFactory {
    async fn load(&self, source: &AudioSource, events: EventSink) -> Result<Box<dyn Sound>> {
        let bytes = self.read(source).await?;
        let decoder = Decoder::new(Cursor::new(bytes))
            .map_err(|e| Error::sound(format!("cannot decode {}: {e}", source.uri())))?;
        let duration = decoder.total_duration().map(|d| d.as_secs_f64());

        let sink = self.new_sink().await?;
        sink.pause();
        sink.append(decoder);

        let sound = Arc::new(RodioSound {
            sink,
            duration,
            playing: AtomicBool::new(false),
            unloaded: AtomicBool::new(false),
            events,
        });
        tokio::spawn(watch_for_end(Arc::downgrade(&sound)));

        Ok(Box::new(RodioHandle(sound)))
    }
}

async fn watch_for_end(sound: Weak<RodioSound>) {
    let mut ticker = tokio::time::interval(END_POLL_INTERVAL);
    loop {
        ticker.tick().await;
        let Some(sound) = sound.upgrade() else {
            return;
        };
        if sound.unloaded.load(Ordering::SeqCst) {
            return;
        }
        if sound.playing.load(Ordering::SeqCst) && sound.sink.empty() {
            sound.playing.store(false, Ordering::SeqCst);
            (sound.events)(SoundEvent::End);
        }
    }
}

struct RodioSound {
    sink: Sink,
    duration: Option<f64>,
    playing: AtomicBool,
    unloaded: AtomicBool,
    events: EventSink,
}

impl RodioSound {
    fn live(&self) -> bool {
        !self.unloaded.load(Ordering::SeqCst)
    }
}

struct RodioHandle(Arc<RodioSound>);

impl Sound for RodioHandle {
    fn play(&self) {
        let s = &self.0;
        if !s.live() || s.sink.empty() {
            return;
        }
        s.sink.play();
        s.playing.store(true, Ordering::SeqCst);
        (s.events)(SoundEvent::Play);
    }

    fn pause(&self) {
        let s = &self.0;
        if !s.live() {
            return;
        }
        s.sink.pause();
        s.playing.store(false, Ordering::SeqCst);
        (s.events)(SoundEvent::Pause);
    }

    fn stop(&self) {
        let s = &self.0;
        if !s.live() {
            return;
        }
        s.sink.pause();
        if let Err(e) = s.sink.try_seek(Duration::ZERO) {
            debug!("Rewind failed: {}", e);
        }
        s.playing.store(false, Ordering::SeqCst);
        (s.events)(SoundEvent::Stop);
    }

    fn seek(&self, position: f64) {
        let s = &self.0;
        if !s.live() {
            return;
        }
        let mut target = position.max(0.0);
        if let Some(d) = s.duration {
            target = target.min(d);
        }
        if let Err(e) = s.sink.try_seek(Duration::from_secs_f64(target)) {
            warn!("Seek to {:.1}s failed: {}", target, e);
        }
        (s.events)(SoundEvent::Seek);
    }

    fn is_playing(&self) -> bool {
        self.0.live() && self.0.playing.load(Ordering::SeqCst) && !self.0.sink.is_paused()
    }

    fn position(&self) -> f64 {
        self.0.sink.get_pos().as_secs_f64()
    }

    fn duration(&self) -> Option<f64> {
        self.0.duration
    }

    fn set_volume(&self, volume: f32) {
        self.0.sink.set_volume(volume);
    }

    fn volume(&self) -> f32 {
        self.0.sink.volume()
    }

    fn unload(&self) {
        let s = &self.0;
        if s.unloaded.swap(true, Ordering::SeqCst) {
            return;
        }
        s.playing.store(false, Ordering::SeqCst);
        s.sink.stop();
    }
}

impl Drop for RodioHandle {
    fn drop(&mut self) {
        self.unload();
    }
}
