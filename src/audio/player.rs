use super::{EngineState, MediaEngine, Track};
use crate::config::PlaybackConfig;
use crate::error::{Error, Result};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Notifications for the terminal indicator. Nothing in the control loops
/// reads these back.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    PlaylistLoaded { tracks: usize },
    StateChanged(EngineState),
    TrackChanged(Option<Track>),
    Error(String),
}

/// Wraps an engine whose commands complete asynchronously. Every state
/// change is issued, polled and re-issued until the engine reports the
/// desired state or the attempt ceiling is hit.
pub struct PlaybackController<E> {
    engine: E,
    retry_interval: Duration,
    max_attempts: u32,
    loaded: bool,
    event_sender: Option<mpsc::UnboundedSender<PlayerEvent>>,
}

impl<E: MediaEngine> PlaybackController<E> {
    pub fn new(engine: E, config: &PlaybackConfig) -> Self {
        Self {
            engine,
            retry_interval: config.retry_interval(),
            max_attempts: config.retry_attempts.max(1),
            loaded: false,
            event_sender: None,
        }
    }

    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<PlayerEvent>) {
        self.event_sender = Some(sender);
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// Tears down the engine's list and rebuilds it from `tracks`.
    pub fn replace_playlist(&mut self, tracks: &[Track]) -> Result<()> {
        self.engine.replace_playlist(tracks)?;
        self.loaded = true;

        for track in tracks {
            debug!("Added song to playlist: {}", track.file_name());
        }
        info!("Added {} songs to playlist", tracks.len());
        self.notify(PlayerEvent::PlaylistLoaded { tracks: tracks.len() });
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        if self.engine.track_count() == 0 {
            info!("Can't play, no media in playlist.");
            return Ok(());
        }
        self.drive("play", EngineState::Playing, E::play)?;
        info!("Playing.");
        self.notify(PlayerEvent::TrackChanged(self.engine.current_track().cloned()));
        Ok(())
    }

    /// No-op unless the engine is currently playing.
    pub fn pause(&mut self) -> Result<()> {
        if self.engine.state() != EngineState::Playing {
            return Ok(());
        }
        self.drive("pause", EngineState::Paused, E::pause)?;
        info!("Paused playlist");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.loaded {
            return Ok(());
        }
        self.drive("stop", EngineState::Stopped, E::stop)?;
        info!("Stopped");
        Ok(())
    }

    pub fn next(&mut self) -> Result<()> {
        self.engine.next()?;
        self.notify(PlayerEvent::TrackChanged(self.engine.current_track().cloned()));
        Ok(())
    }

    pub fn previous(&mut self) -> Result<()> {
        self.engine.previous()?;
        self.notify(PlayerEvent::TrackChanged(self.engine.current_track().cloned()));
        Ok(())
    }

    fn drive(
        &mut self,
        action: &'static str,
        desired: EngineState,
        command: fn(&mut E) -> Result<()>,
    ) -> Result<()> {
        if self.engine.state() == desired {
            return Ok(());
        }

        for attempt in 1..=self.max_attempts {
            command(&mut self.engine)?;
            thread::sleep(self.retry_interval);

            let state = self.engine.state();
            if state == desired {
                self.notify(PlayerEvent::StateChanged(state));
                return Ok(());
            }
            debug!("{} attempt {}: engine is {:?}, want {:?}", action, attempt, state, desired);
        }

        warn!("Engine did not reach {:?} while trying to {}, forcing stop", desired, action);
        self.hard_stop();
        let err = Error::PlaybackTimeout { action, attempts: self.max_attempts };
        self.notify(PlayerEvent::Error(err.to_string()));
        Err(err)
    }

    /// Last resort after a timeout: one unchecked stop, errors only logged.
    fn hard_stop(&mut self) {
        if let Err(e) = self.engine.stop() {
            warn!("Hard stop failed: {}", e);
        }
        self.notify(PlayerEvent::StateChanged(self.engine.state()));
    }

    fn notify(&self, event: PlayerEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }
}
