use super::FolderPicker;
use crate::error::{Error, Result};
use dialoguer::Input;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Line prompt. End of input cancels.
#[derive(Debug, Default)]
pub struct TerminalPicker;

impl TerminalPicker {
    pub fn new() -> Self {
        Self
    }
}

impl FolderPicker for TerminalPicker {
    fn pick(&mut self, start: Option<&Path>) -> Result<Option<PathBuf>> {
        let mut input = Input::<String>::new().with_prompt("Input path to media");
        if let Some(start) = start {
            input = input.with_initial_text(start.to_string_lossy());
        }

        match input.interact_text() {
            Ok(answer) if answer.trim().is_empty() => Ok(None),
            Ok(answer) => Ok(Some(PathBuf::from(answer.trim()))),
            Err(dialoguer::Error::IO(e))
                if matches!(e.kind(), ErrorKind::UnexpectedEof | ErrorKind::Interrupted) =>
            {
                Ok(None)
            }
            Err(e) => Err(Error::Prompt(e.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogTool {
    Zenity,
    Kdialog,
}

/// Native directory dialog through zenity or kdialog.
#[derive(Debug)]
pub struct DialogPicker {
    tool: DialogTool,
}

impl DialogPicker {
    pub fn detect() -> Option<Self> {
        [("zenity", DialogTool::Zenity), ("kdialog", DialogTool::Kdialog)]
            .into_iter()
            .find(|(bin, _)| on_path(bin))
            .map(|(bin, tool)| {
                debug!("Using {} for folder selection", bin);
                Self { tool }
            })
    }

    fn command(&self, start: Option<&Path>) -> Command {
        match self.tool {
            DialogTool::Zenity => {
                let mut cmd = Command::new("zenity");
                cmd.args(["--file-selection", "--directory", "--title=Select album"]);
                if let Some(start) = start {
                    cmd.arg(format!("--filename={}/", start.display()));
                }
                cmd
            }
            DialogTool::Kdialog => {
                let mut cmd = Command::new("kdialog");
                cmd.arg("--getexistingdirectory");
                cmd.arg(start.unwrap_or_else(|| Path::new(".")));
                cmd
            }
        }
    }
}

impl FolderPicker for DialogPicker {
    fn pick(&mut self, start: Option<&Path>) -> Result<Option<PathBuf>> {
        info!("Opening file dialog... Select album");
        let output = self.command(start).output()?;

        // both tools exit 1 on cancel
        if !output.status.success() {
            return Ok(None);
        }
        let chosen = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!chosen.is_empty()).then(|| PathBuf::from(chosen)))
    }
}

fn on_path(bin: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(bin).is_file()))
        .unwrap_or(false)
}
