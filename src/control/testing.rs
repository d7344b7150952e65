//! Scripted stand-ins for the reader, the engine and the operator.

use super::Interrupt;
use crate::audio::{EngineState, MediaEngine, Track};
use crate::error::{Error, Result};
use crate::tag::{ndef, TagHandle, TagReader};
use crate::ui::{FolderPicker, Operator};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const FOREVER: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub struct TagState {
    pub message: Option<Vec<u8>>,
    /// presence checks answered with true before the tag leaves
    pub present_for: u32,
    pub fail_writes: bool,
    /// writes report success but the content never changes
    pub lossy_writes: bool,
    pub writes: u32,
    /// presence checks made so far
    pub checks: u32,
    /// raised on the given presence check, like a Ctrl-C while the tag sits there
    pub interrupt_at: Option<(u32, Interrupt)>,
}

impl TagState {
    pub fn unformatted() -> Self {
        Self {
            message: None,
            present_for: FOREVER,
            fail_writes: false,
            lossy_writes: false,
            writes: 0,
            checks: 0,
            interrupt_at: None,
        }
    }

    pub fn blank() -> Self {
        Self { message: Some(vec![0xD0, 0x00, 0x00]), ..Self::unformatted() }
    }

    pub fn with_id(id: &str) -> Self {
        Self { message: Some(ndef::encode_identifier(id)), ..Self::unformatted() }
    }

    pub fn present_for(mut self, checks: u32) -> Self {
        self.present_for = checks;
        self
    }

    pub fn interrupting_at(mut self, check: u32, interrupt: &Interrupt) -> Self {
        self.interrupt_at = Some((check, interrupt.clone()));
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn identifier(&self) -> Option<String> {
        self.message.as_deref().and_then(|m| ndef::decode_identifier(m).ok().flatten())
    }
}

pub struct FakeTag {
    state: Rc<RefCell<TagState>>,
    gone: Cell<bool>,
}

impl FakeTag {
    pub fn new(state: TagState) -> (Self, Rc<RefCell<TagState>>) {
        let shared = Rc::new(RefCell::new(state));
        (Self { state: Rc::clone(&shared), gone: Cell::new(false) }, shared)
    }
}

impl TagHandle for FakeTag {
    fn is_present(&self) -> bool {
        if self.gone.get() {
            return false;
        }
        let mut state = self.state.borrow_mut();
        state.checks += 1;
        if let Some((at, interrupt)) = &state.interrupt_at {
            if state.checks == *at {
                interrupt.raise();
            }
        }
        match state.present_for {
            0 => {
                self.gone.set(true);
                false
            }
            FOREVER => true,
            _ => {
                state.present_for -= 1;
                true
            }
        }
    }

    fn read_message(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.state.borrow().message.clone())
    }

    fn write_message(&mut self, message: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(Error::TagWriteFailed("tag left the field".into()));
        }
        if !state.lossy_writes {
            state.message = Some(message.to_vec());
        }
        state.writes += 1;
        Ok(())
    }
}

pub enum ReaderEvent {
    Tag(FakeTag),
    Interrupt,
}

/// Hands out scripted events in order, then behaves as if interrupted.
#[derive(Default)]
pub struct FakeReader {
    events: VecDeque<ReaderEvent>,
}

impl FakeReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&mut self, state: TagState) -> Rc<RefCell<TagState>> {
        let (tag, shared) = FakeTag::new(state);
        self.events.push_back(ReaderEvent::Tag(tag));
        shared
    }

    pub fn interrupt(&mut self) {
        self.events.push_back(ReaderEvent::Interrupt);
    }
}

impl TagReader for FakeReader {
    type Handle = FakeTag;

    fn wait_for_tag(&mut self, interrupt: &Interrupt) -> Result<Option<FakeTag>> {
        if interrupt.is_raised() {
            return Ok(None);
        }
        match self.events.pop_front() {
            Some(ReaderEvent::Tag(tag)) => Ok(Some(tag)),
            Some(ReaderEvent::Interrupt) | None => {
                interrupt.raise();
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineLog {
    pub replace: u32,
    pub play: u32,
    pub pause: u32,
    pub stop: u32,
    pub next: u32,
    pub previous: u32,
}

impl EngineLog {
    pub fn commands(&self) -> u32 {
        self.replace + self.play + self.pause + self.stop + self.next + self.previous
    }
}

/// Engine whose commands take effect only after `lag` ignored repeats.
/// A stuck engine never starts or pauses, but can always be stopped.
/// An ending engine reports `Ended` once a playing list has been polled
/// a set number of times.
#[derive(Debug)]
pub struct FakeEngine {
    pub state: EngineState,
    pub tracks: Vec<Track>,
    pub loaded: Vec<Vec<Track>>,
    pub log: EngineLog,
    lag: u32,
    stuck: bool,
    ignored: u32,
    polls_left: Cell<Option<u32>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::with_lag(0)
    }
}

impl FakeEngine {
    pub fn with_lag(lag: u32) -> Self {
        Self {
            state: EngineState::NothingSpecial,
            tracks: Vec::new(),
            loaded: Vec::new(),
            log: EngineLog::default(),
            lag,
            stuck: false,
            ignored: 0,
            polls_left: Cell::new(None),
        }
    }

    pub fn stuck() -> Self {
        Self { stuck: true, ..Self::default() }
    }

    pub fn ending_after(polls: u32) -> Self {
        Self { polls_left: Cell::new(Some(polls)), ..Self::default() }
    }

    fn settle(&mut self, target: EngineState) {
        if self.stuck && target != EngineState::Stopped {
            return;
        }
        if self.ignored < self.lag {
            self.ignored += 1;
            return;
        }
        self.ignored = 0;
        self.state = target;
    }
}

impl MediaEngine for FakeEngine {
    fn replace_playlist(&mut self, tracks: &[Track]) -> Result<()> {
        self.log.replace += 1;
        self.tracks = tracks.to_vec();
        self.loaded.push(tracks.to_vec());
        self.state = EngineState::NothingSpecial;
        self.ignored = 0;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.log.play += 1;
        self.settle(EngineState::Playing);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.log.pause += 1;
        self.settle(EngineState::Paused);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.log.stop += 1;
        self.settle(EngineState::Stopped);
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        self.log.next += 1;
        Ok(())
    }

    fn previous(&mut self) -> Result<()> {
        self.log.previous += 1;
        Ok(())
    }

    fn state(&self) -> EngineState {
        if self.state == EngineState::Playing {
            match self.polls_left.get() {
                Some(0) => return EngineState::Ended,
                Some(left) => self.polls_left.set(Some(left - 1)),
                None => {}
            }
        }
        self.state
    }

    fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn current_track(&self) -> Option<&Track> {
        match self.state {
            EngineState::Playing | EngineState::Paused => self.tracks.first(),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct OperatorLog {
    pub answers: VecDeque<bool>,
    pub questions: Vec<String>,
    pub announcements: Vec<String>,
    /// raised while a question is on screen, like a Ctrl-C inside the prompt
    pub interrupt_on_confirm: Option<Interrupt>,
}

pub struct ScriptedOperator(pub Rc<RefCell<OperatorLog>>);

impl ScriptedOperator {
    pub fn new(answers: &[bool]) -> (Self, Rc<RefCell<OperatorLog>>) {
        let log = Rc::new(RefCell::new(OperatorLog {
            answers: answers.iter().copied().collect(),
            ..OperatorLog::default()
        }));
        (Self(Rc::clone(&log)), log)
    }
}

impl Operator for ScriptedOperator {
    fn announce(&mut self, message: &str) {
        self.0.borrow_mut().announcements.push(message.to_string());
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        let mut log = self.0.borrow_mut();
        log.questions.push(question.to_string());
        if let Some(interrupt) = &log.interrupt_on_confirm {
            interrupt.raise();
        }
        Ok(log.answers.pop_front().unwrap_or(false))
    }
}

pub struct ScriptedPicker {
    picks: VecDeque<Option<PathBuf>>,
    pub starts: Rc<RefCell<Vec<Option<PathBuf>>>>,
}

impl ScriptedPicker {
    pub fn new(picks: Vec<Option<PathBuf>>) -> (Self, Rc<RefCell<Vec<Option<PathBuf>>>>) {
        let starts = Rc::new(RefCell::new(Vec::new()));
        (Self { picks: picks.into(), starts: Rc::clone(&starts) }, starts)
    }
}

impl FolderPicker for ScriptedPicker {
    fn pick(&mut self, start: Option<&Path>) -> Result<Option<PathBuf>> {
        self.starts.borrow_mut().push(start.map(Path::to_path_buf));
        Ok(self.picks.pop_front().flatten())
    }
}
