// Tag reader boundary - the controllers only ever see these two traits
// Hardware transports live behind them; `spool` is the one shipped here

pub mod ndef;
pub mod spool;

pub use spool::{SpoolReader, SpoolTag};

use crate::control::Interrupt;
use crate::error::Result;

/// One attachment of one tag. Once it reports absent it stays absent;
/// the next attachment is a new handle.
pub trait TagHandle {
    fn is_present(&self) -> bool;

    /// Raw NDEF message bytes, or None if the tag carries no NDEF data.
    fn read_message(&mut self) -> Result<Option<Vec<u8>>>;

    /// Fails with `TagWriteFailed` when the tag leaves mid-write.
    fn write_message(&mut self, message: &[u8]) -> Result<()>;
}

pub trait TagReader {
    type Handle: TagHandle;

    /// Blocks until a tag attaches. Returns None once `interrupt` is raised.
    fn wait_for_tag(&mut self, interrupt: &Interrupt) -> Result<Option<Self::Handle>>;
}
