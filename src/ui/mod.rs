// Operator-facing side of tapdeck: prompts, folder pickers and the
// playback indicator. None of it feeds back into control decisions.

pub mod display;
pub mod picker;

pub use display::run_display;
pub use picker::{DialogPicker, TerminalPicker};

use crate::config::DisplayMode;
use crate::control::Interrupt;
use crate::error::{Error, Result};
use dialoguer::Confirm;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SCAN_BANNER: &str = concat!(
    "  ___  ___   _   _  _   _____ _   ___ \n",
    " / __|/ __| /_\\ | \\| | |_   _/_\\ / __|\n",
    " \\__ \\ (__ / _ \\| .` |   | |/ _ \\ (_ |\n",
    " |___/\\___/_/ \\_\\_|\\_|   |_/_/ \\_\\___|",
);

/// The person at the reader during provisioning.
pub trait Operator {
    fn announce(&mut self, message: &str);
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Chooses a media path. `Ok(None)` means the operator cancelled.
pub trait FolderPicker {
    fn pick(&mut self, start: Option<&Path>) -> Result<Option<PathBuf>>;
}

pub struct TerminalOperator {
    interrupt: Interrupt,
}

impl TerminalOperator {
    /// Ctrl-C pressed inside a prompt is forwarded to `interrupt`.
    pub fn new(interrupt: Interrupt) -> Self {
        Self { interrupt }
    }
}

impl Operator for TerminalOperator {
    fn announce(&mut self, message: &str) {
        println!("{}", message);
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        match Confirm::new().with_prompt(question).interact() {
            Ok(answer) => Ok(answer),
            Err(dialoguer::Error::IO(e)) if e.kind() == ErrorKind::Interrupted => {
                self.interrupt.raise();
                Ok(false)
            }
            Err(e) => Err(Error::Prompt(e.to_string())),
        }
    }
}

/// Whether a graphical picker should be used.
pub fn use_graphical_picker(mode: DisplayMode) -> bool {
    match mode {
        DisplayMode::Gui => true,
        DisplayMode::Terminal => false,
        DisplayMode::Auto => {
            info!("Checking for display...");
            let found = ["DISPLAY", "WAYLAND_DISPLAY"]
                .iter()
                .any(|var| std::env::var_os(var).map_or(false, |v| !v.is_empty()));
            if found {
                info!("Display found.");
            } else {
                info!("Display not found.");
            }
            found
        }
    }
}

/// Graphical picker when wanted and available, terminal prompt otherwise.
pub fn folder_picker(mode: DisplayMode) -> Box<dyn FolderPicker> {
    if use_graphical_picker(mode) {
        if let Some(dialog) = DialogPicker::detect() {
            return Box::new(dialog);
        }
        info!("No graphical folder picker installed, falling back to the terminal");
    }
    Box::new(TerminalPicker::new())
}
