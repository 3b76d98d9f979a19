//! Audio preview playback.
//!
//! At most one sound plays at a time. The sound library is abstracted behind
//! [`SoundBackend`]; [`PlaybackController`] owns the single active sound and
//! publishes its state on a watch channel.
//!
//! This is library API for an embedding front end that supplies a
//! [`SoundBackend`]; the proxy binary has no audio device and does not
//! drive it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::Error;

/// A loaded sound.
pub trait Sound: Send {
    fn play(&mut self) -> Result<(), Error>;
    fn pause(&mut self);
    fn stop(&mut self);
    /// Release the underlying resources. The sound is not used afterwards.
    fn unload(&mut self);
}

/// Loads sources into [`Sound`]s.
pub trait SoundBackend: Send + Sync {
    fn load(&self, src: &str) -> Result<Box<dyn Sound>, Error>;
}

/// What is playing, as observed by the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PlaybackState {
    pub playing_id: Option<String>,
    pub src: Option<String>,
    pub is_playing: bool,
}

struct Active {
    id: String,
    sound: Box<dyn Sound>,
}

/// Owner of the single active playback.
pub struct PlaybackController {
    backend: Arc<dyn SoundBackend>,
    active: Mutex<Option<Active>>,
    tx: watch::Sender<PlaybackState>,
}

impl PlaybackController {
    pub fn new(backend: Arc<dyn SoundBackend>) -> Self {
        let (tx, _) = watch::channel(PlaybackState::default());
        Self { backend, active: Mutex::new(None), tx }
    }

    pub fn state(&self) -> PlaybackState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.tx.subscribe()
    }

    /// Play, pause or switch.
    ///
    /// The same `id` pauses a playing sound and resumes a paused one. A new
    /// `id` tears down the current sound and starts `src`. An empty `src`
    /// only tears down.
    ///
    /// # Errors
    ///
    /// Returns `Error::Playback` if the source cannot be loaded or played;
    /// the state is reset first.
    pub fn toggle(&self, id: &str, src: &str) -> Result<PlaybackState, Error> {
        if id.is_empty() {
            return Ok(self.state());
        }

        let mut active = self.lock();
        if let Some(current) = active.as_mut().filter(|current| current.id == id) {
            let playing = self.tx.borrow().is_playing;
            if playing {
                current.sound.pause();
            } else if let Err(e) = current.sound.play() {
                teardown(&mut active, false);
                self.publish(PlaybackState::default());
                return Err(e);
            }
            self.tx.send_modify(|state| state.is_playing = !playing);
            return Ok(self.state());
        }

        teardown(&mut active, true);
        let src = to_relative(src);
        if src.is_empty() {
            self.publish(PlaybackState::default());
            return Ok(self.state());
        }

        let started = self.backend.load(&src).and_then(|mut sound| {
            if let Err(e) = sound.play() {
                sound.unload();
                return Err(e);
            }
            Ok(sound)
        });

        match started {
            Ok(sound) => {
                *active = Some(Active { id: id.to_string(), sound });
                self.publish(PlaybackState { playing_id: Some(id.to_string()), src: Some(src), is_playing: true });
                tracing::debug!(id = %id, "playback started");
                Ok(self.state())
            }
            Err(e) => {
                self.publish(PlaybackState::default());
                tracing::warn!(id = %id, error = %e, "playback failed");
                Err(Error::Playback(format!("{id}: {e}")))
            }
        }
    }

    /// Stop the current sound. With an `id`, only if that sound is current.
    pub fn stop(&self, id: Option<&str>) {
        let mut active = self.lock();
        if let (Some(id), Some(current)) = (id, active.as_ref()) {
            if current.id != id {
                return;
            }
        }
        teardown(&mut active, true);
        self.publish(PlaybackState::default());
    }

    /// Stop only if `id` is the current sound.
    pub fn stop_if_matching(&self, id: &str) {
        if id.is_empty() || self.state().playing_id.as_deref() != Some(id) {
            return;
        }
        self.stop(Some(id));
    }

    /// The host reports that a sound ended, was stopped externally, or
    /// errored. Ignored unless it refers to the current sound.
    pub fn on_ended(&self, id: &str) {
        let mut active = self.lock();
        if active.as_ref().is_none_or(|current| current.id != id) {
            return;
        }
        teardown(&mut active, false);
        self.publish(PlaybackState::default());
    }

    fn lock(&self) -> MutexGuard<'_, Option<Active>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: PlaybackState) {
        self.tx.send_replace(state);
    }
}

fn teardown(active: &mut Option<Active>, stop: bool) {
    if let Some(mut current) = active.take() {
        if stop {
            current.sound.stop();
        }
        current.sound.unload();
    }
}

/// Root-relative sources are made document-relative so they resolve inside
/// the scope. Absolute http(s) URLs are kept.
pub fn to_relative(src: &str) -> String {
    let src = src.trim();
    let lower = src.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return src.to_string();
    }
    match src.strip_prefix('/') {
        Some(rest) => format!("./{rest}"),
        None => src.to_string(),
    }
}
