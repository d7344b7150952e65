// The two top-level loops and what they share
// Exactly one of them runs per process

pub mod batch;
pub mod provision;
pub mod standby;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::BatchQueue;
pub use provision::{ProvisionController, ProvisionExit, ProvisionOptions};
pub use standby::{PlaybackSession, StandbyController, StandbyOptions};

use crate::error::{Error, Result};
use crate::tag::{ndef, TagHandle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Namespace of identifiers minted by this program.
pub const ID_PREFIX: &str = "NFCMP_";

const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Cooperative cancellation. Every raise is counted so that callers can
/// tell a first signal from a repeated one.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    pending: Arc<AtomicUsize>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.pending() > 0
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Clears all pending signals, returning how many there were.
    pub fn acknowledge(&self) -> usize {
        self.pending.swap(0, Ordering::SeqCst)
    }

    /// Sleeps for `duration` unless interrupted first. Returns true if interrupted.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_raised() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

/// Fresh identifier for a tag. Not checked against the registry.
pub fn mint_identifier() -> String {
    format!("{}{}", ID_PREFIX, Uuid::new_v4())
}

/// Identifier stored on the tag.
///
/// `NoTag` if it already left, `NoMessage` if it has no NDEF data, and
/// `Ok(None)` if the message holds no text record.
pub fn read_identifier<T: TagHandle>(tag: &mut T) -> Result<Option<String>> {
    if !tag.is_present() {
        return Err(Error::NoTag);
    }
    let Some(message) = tag.read_message()? else {
        return Err(Error::NoMessage);
    };
    debug!("Getting tag identifier");
    let id = ndef::decode_identifier(&message)?;
    if let Some(id) = &id {
        info!("Tag UUID: {}", id);
    }
    Ok(id)
}

/// Polls until the tag leaves. Returns false if `abort_at` or more
/// interrupts are pending before that happens.
pub fn wait_for_removal<T: TagHandle>(
    tag: &T,
    interrupt: &Interrupt,
    poll: Duration,
    abort_at: usize,
) -> bool {
    while tag.is_present() {
        if interrupt.pending() >= abort_at {
            return false;
        }
        thread::sleep(poll);
    }
    true
}
