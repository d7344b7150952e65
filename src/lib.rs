// tapdeck library - tag reader, registry and the two control loops
// The binary only wires these together

pub mod audio;     // track scanning, engine, retrying playback controller
pub mod config;    // settings file and defaults
pub mod control;   // standby and provisioning loops, interrupt token
pub mod error;     // error taxonomy
pub mod registry;  // tag id -> media path store
pub mod tag;       // reader traits, NDEF codec, spool backend
pub mod ui;        // operator prompts, folder pickers, playback indicator

pub use audio::{MediaEngine, MediaScanner, PlaybackController, PlayerEvent, Track};
pub use config::Config;
pub use control::{Interrupt, ProvisionController, StandbyController};
pub use error::{Error, Result};
pub use registry::TagRegistry;
