use super::{read_identifier, wait_for_removal, Interrupt};
use crate::audio::{EngineState, MediaEngine, MediaScanner, PlaybackController, Track};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::TagRegistry;
use crate::tag::{TagHandle, TagReader};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct StandbyOptions {
    /// Pause after a failed read before listening again
    pub cooldown: Duration,
    /// Presence polling while music plays
    pub watch_interval: Duration,
    /// Presence polling while waiting for a tag to leave
    pub removal_poll: Duration,
}

impl StandbyOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cooldown: config.standby.cooldown(),
            watch_interval: config.playback.watch_interval(),
            removal_poll: config.reader.poll_interval(),
        }
    }
}

/// Track list currently loaded in the engine and the tag it was built for.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub id: String,
    pub path: PathBuf,
    pub tracks: Vec<Track>,
}

enum Step {
    Continue,
    Quit,
}

/// Plays whatever folder the tag on the reader points at, pausing as soon
/// as the tag is taken away.
pub struct StandbyController<R, E> {
    reader: R,
    registry: TagRegistry,
    player: PlaybackController<E>,
    scanner: MediaScanner,
    interrupt: Interrupt,
    options: StandbyOptions,
    session: Option<PlaybackSession>,
    rebuilds: usize,
}

impl<R, E> StandbyController<R, E>
where
    R: TagReader,
    E: MediaEngine,
{
    pub fn new(
        reader: R,
        registry: TagRegistry,
        player: PlaybackController<E>,
        interrupt: Interrupt,
        options: StandbyOptions,
    ) -> Self {
        Self {
            reader,
            registry,
            player,
            scanner: MediaScanner::new(),
            interrupt,
            options,
            session: None,
            rebuilds: 0,
        }
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// How many times a track list was built since start.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    pub fn player(&self) -> &PlaybackController<E> {
        &self.player
    }

    /// Runs until interrupted, then stops the engine.
    pub fn run(&mut self) -> Result<()> {
        let outcome = self.serve_forever();

        info!("Quitting...");
        if let Err(e) = self.player.stop() {
            warn!("Could not stop playback cleanly: {}", e);
        }
        outcome
    }

    fn serve_forever(&mut self) -> Result<()> {
        loop {
            info!("Waiting for tag...");
            let Some(mut tag) = self.reader.wait_for_tag(&self.interrupt)? else {
                return Ok(());
            };

            let step = match self.serve(&mut tag) {
                Ok(step) => step,
                Err(e) => self.recover(&tag, e)?,
            };
            if let Step::Quit = step {
                return Ok(());
            }
        }
    }

    fn serve(&mut self, tag: &mut R::Handle) -> Result<Step> {
        let id = read_identifier(tag)?.ok_or(Error::NoIdentifier)?;
        let path = self.registry.lookup(&id)?;

        let is_new = self.session.as_ref().map_or(true, |s| s.id != id);
        if is_new {
            self.load_session(id, path)?;
        } else {
            info!("Continuing.");
        }

        self.player.play()?;

        while self.player.state() == EngineState::Playing && tag.is_present() {
            if self.interrupt.sleep(self.options.watch_interval) {
                return Ok(Step::Quit);
            }
        }
        self.player.pause()?;

        if !self.await_removal(tag) {
            return Ok(Step::Quit);
        }
        Ok(Step::Continue)
    }

    fn load_session(&mut self, id: String, path: PathBuf) -> Result<()> {
        // a half-built session must never be mistaken for the current one
        self.session = None;

        let tracks = self.scanner.load(&path)?;
        if let Some(playlist) = self.scanner.find_playlist(&path) {
            debug!("Ignoring playlist {}, tracks come from the folder listing", playlist.display());
        }
        self.player.replace_playlist(&tracks)?;
        self.rebuilds += 1;
        debug!("Session for {} holds {} tracks", id, tracks.len());
        self.session = Some(PlaybackSession { id, path, tracks });
        Ok(())
    }

    /// Logs a failed cycle and decides whether to keep listening.
    fn recover(&mut self, tag: &R::Handle, err: Error) -> Result<Step> {
        match err {
            Error::NoTag => {
                error!("{}", err);
                Ok(Step::Continue)
            }
            Error::NoMessage | Error::NoIdentifier | Error::Ndef(_) => {
                error!("{}", err);
                Ok(self.cool_down())
            }
            Error::NoPath { .. } | Error::MissingMedia(_) => {
                error!("No path exception: {}", err);
                if let Step::Quit = self.cool_down() {
                    return Ok(Step::Quit);
                }
                Ok(self.removal_step(tag))
            }
            Error::PlaybackTimeout { .. } => {
                warn!("{}", err);
                Ok(self.removal_step(tag))
            }
            other => Err(other),
        }
    }

    fn cool_down(&self) -> Step {
        if self.interrupt.sleep(self.options.cooldown) {
            Step::Quit
        } else {
            Step::Continue
        }
    }

    fn removal_step(&self, tag: &R::Handle) -> Step {
        if self.await_removal(tag) {
            Step::Continue
        } else {
            Step::Quit
        }
    }

    fn await_removal(&self, tag: &R::Handle) -> bool {
        wait_for_removal(tag, &self.interrupt, self.options.removal_poll, 1)
    }
}
