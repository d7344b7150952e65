use super::Track;
use crate::error::Result;

/// State as reported by the engine. Commands are not guaranteed to have
/// taken effect when they return, so callers poll this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NothingSpecial,
    Playing,
    Paused,
    Stopped,
    Ended,
}

/// Primitive operations of a list-based media engine.
pub trait MediaEngine {
    /// Drops the current list entirely and starts a new one from `tracks`.
    fn replace_playlist(&mut self, tracks: &[Track]) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn next(&mut self) -> Result<()>;
    fn previous(&mut self) -> Result<()>;
    fn state(&self) -> EngineState;
    fn track_count(&self) -> usize;
    fn current_track(&self) -> Option<&Track>;
}

#[cfg(feature = "audio")]
pub use self::rodio_engine::RodioEngine;

#[cfg(feature = "audio")]
mod rodio_engine {
    use super::{EngineState, MediaEngine, Track};
    use crate::error::{Error, Result};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use std::fs::File;
    use std::io::BufReader;
    use tracing::{debug, warn};

    /// Engine backed by a rodio sink. The whole remaining list is queued on
    /// the sink, so moving to another position means rebuilding the sink.
    pub struct RodioEngine {
        _stream: OutputStream,
        stream_handle: OutputStreamHandle,
        sink: Option<Sink>,
        tracks: Vec<Track>,
        // index of the first track queued on the current sink
        start_index: usize,
        queued: usize,
        stopped: bool,
        volume: f32,
    }

    impl RodioEngine {
        pub fn new(volume: f32) -> Result<Self> {
            let (stream, stream_handle) =
                OutputStream::try_default().map_err(|e| Error::Engine(e.to_string()))?;

            Ok(Self {
                _stream: stream,
                stream_handle,
                sink: None,
                tracks: Vec::new(),
                start_index: 0,
                queued: 0,
                stopped: false,
                volume: volume.clamp(0.0, 1.0),
            })
        }

        fn current_index(&self) -> Option<usize> {
            let sink = self.sink.as_ref()?;
            let remaining = sink.len();
            if remaining == 0 {
                return None;
            }
            Some(self.start_index + (self.queued - remaining))
        }

        /// Builds a paused sink holding every track from `index` to the end.
        fn load_from(&mut self, index: usize) -> Result<()> {
            if let Some(old) = self.sink.take() {
                old.stop();
            }

            let sink = Sink::try_new(&self.stream_handle).map_err(|e| Error::Engine(e.to_string()))?;
            sink.pause();
            sink.set_volume(self.volume);

            let mut queued = 0;
            for track in self.tracks.iter().skip(index) {
                let file = match File::open(&track.file_path) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!("Failed to open {}: {}", track.file_path.display(), e);
                        continue;
                    }
                };
                match Decoder::new(BufReader::new(file)) {
                    Ok(source) => {
                        sink.append(source);
                        queued += 1;
                    }
                    Err(e) => warn!("Unsupported or corrupted file {}: {}", track.file_path.display(), e),
                }
            }

            debug!("Queued {} tracks starting at index {}", queued, index);
            self.start_index = index;
            self.queued = queued;
            self.sink = Some(sink);
            self.stopped = false;
            Ok(())
        }
    }

    impl MediaEngine for RodioEngine {
        fn replace_playlist(&mut self, tracks: &[Track]) -> Result<()> {
            self.tracks = tracks.to_vec();
            self.load_from(0)
        }

        fn play(&mut self) -> Result<()> {
            if self.stopped || self.sink.as_ref().map_or(false, |s| s.empty()) {
                self.load_from(0)?;
            }
            if let Some(sink) = &self.sink {
                sink.play();
            }
            Ok(())
        }

        fn pause(&mut self) -> Result<()> {
            if let Some(sink) = &self.sink {
                sink.pause();
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
            self.queued = 0;
            self.stopped = true;
            Ok(())
        }

        fn next(&mut self) -> Result<()> {
            if let Some(sink) = &self.sink {
                sink.skip_one();
            }
            Ok(())
        }

        fn previous(&mut self) -> Result<()> {
            let Some(index) = self.current_index() else {
                return Ok(());
            };
            let playing = self.state() == EngineState::Playing;
            self.load_from(index.saturating_sub(1))?;
            if playing {
                if let Some(sink) = &self.sink {
                    sink.play();
                }
            }
            Ok(())
        }

        fn state(&self) -> EngineState {
            if self.stopped {
                return EngineState::Stopped;
            }
            match &self.sink {
                None => EngineState::NothingSpecial,
                Some(sink) if sink.empty() => {
                    if self.queued > 0 {
                        EngineState::Ended
                    } else {
                        EngineState::NothingSpecial
                    }
                }
                Some(sink) if sink.is_paused() => EngineState::Paused,
                Some(_) => EngineState::Playing,
            }
        }

        fn track_count(&self) -> usize {
            self.tracks.len()
        }

        fn current_track(&self) -> Option<&Track> {
            self.current_index().and_then(|i| self.tracks.get(i))
        }
    }
}
