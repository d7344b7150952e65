use super::{mint_identifier, read_identifier, wait_for_removal, BatchQueue, Interrupt};
use crate::audio::MediaScanner;
use crate::config::{Config, PathCheck};
use crate::error::{Error, Result};
use crate::registry::{normalize_path, TagRegistry};
use crate::tag::{ndef, TagHandle, TagReader};
use crate::ui::{FolderPicker, Operator, SCAN_BANNER};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    pub path_check: PathCheck,
    /// Where the folder picker opens. Without it, the picker reopens next
    /// to the previous choice.
    pub default_directory: Option<PathBuf>,
    pub removal_poll: Duration,
}

impl ProvisionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            path_check: config.provision.path_check,
            default_directory: config.provision.default_directory.clone(),
            removal_poll: config.reader.poll_interval(),
        }
    }
}

/// Why the provisioning loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionExit {
    Interrupted,
    SelectionCancelled,
    QueueExhausted,
}

enum Step {
    Continue,
    Exit(ProvisionExit),
}

/// Binds blank (or confirmed-overwritable) tags to media folders: a fresh
/// identifier goes onto the tag first, and only a successful write is
/// committed to the registry.
pub struct ProvisionController<R> {
    reader: R,
    registry: TagRegistry,
    scanner: MediaScanner,
    operator: Box<dyn Operator>,
    picker: Box<dyn FolderPicker>,
    interrupt: Interrupt,
    options: ProvisionOptions,
    queue: Option<BatchQueue>,
    last_pick_dir: Option<PathBuf>,
    written: usize,
    verified: usize,
}

impl<R: TagReader> ProvisionController<R> {
    pub fn new(
        reader: R,
        registry: TagRegistry,
        operator: Box<dyn Operator>,
        picker: Box<dyn FolderPicker>,
        interrupt: Interrupt,
        options: ProvisionOptions,
    ) -> Self {
        Self {
            reader,
            registry,
            scanner: MediaScanner::new(),
            operator,
            picker,
            interrupt,
            options,
            queue: None,
            last_pick_dir: None,
            written: 0,
            verified: 0,
        }
    }

    /// Work through `queue` instead of asking for a folder per tag.
    pub fn with_batch(mut self, queue: BatchQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    pub fn queue(&self) -> Option<&BatchQueue> {
        self.queue.as_ref()
    }

    /// Tags written and committed.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Tags whose content and registration were read back successfully.
    pub fn verified(&self) -> usize {
        self.verified
    }

    pub fn run(&mut self) -> Result<ProvisionExit> {
        let exit = loop {
            match self.provision_one()? {
                Step::Continue => {}
                Step::Exit(exit) => break exit,
            }
        };

        info!("Quitting... ({} tags written)", self.written);
        if let Some(queue) = self.queue.as_ref().filter(|q| !q.is_empty()) {
            warn!("{} folders were left unprovisioned", queue.len());
        }
        Ok(exit)
    }

    fn provision_one(&mut self) -> Result<Step> {
        let target = match &self.queue {
            Some(queue) => match queue.current() {
                Some(folder) => {
                    self.operator.announce(&format!(
                        "{}\nNext folder ({} left): {}",
                        SCAN_BANNER,
                        queue.len(),
                        folder.display()
                    ));
                    Some(folder.to_path_buf())
                }
                None => {
                    info!("Batch queue is empty");
                    return Ok(Step::Exit(ProvisionExit::QueueExhausted));
                }
            },
            None => {
                self.operator.announce(SCAN_BANNER);
                None
            }
        };

        info!("Waiting for tag...");
        let Some(mut tag) = self.reader.wait_for_tag(&self.interrupt)? else {
            return self.on_interrupt(target.as_deref());
        };

        match self.attend(&mut tag, target) {
            Ok(step) => Ok(step),
            Err(e) if e.is_recoverable() => {
                error!("{}", e);
                Ok(self.finish(&tag))
            }
            Err(e) => Err(e),
        }
    }

    fn attend(&mut self, tag: &mut R::Handle, target: Option<PathBuf>) -> Result<Step> {
        let existing = match read_identifier(tag) {
            Ok(id) => id,
            Err(Error::NoMessage) => {
                info!("Tag is empty.");
                None
            }
            Err(Error::Ndef(reason)) => {
                warn!("Tag content is unreadable ({}), treating it as blank", reason);
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(old_id) = existing {
            match self.registry.lookup(&old_id) {
                Ok(path) => {
                    info!("Tag is already pointing to: {}", path.display());
                    self.operator
                        .announce(&format!("Tag is already pointing to: {}", path.display()));
                    if !self.operator.confirm("Do you want to overwrite this tag?")? {
                        self.operator.announce("Please remove tag.");
                        return Ok(self.finish(tag));
                    }
                    // old binding goes before a new identifier even exists
                    self.registry.delete(&old_id)?;
                    info!("Removed registration {}", old_id);
                }
                Err(Error::NoPath { .. }) => debug!("{} is not registered", old_id),
                Err(e) => return Err(e),
            }
        }

        let id = mint_identifier();

        let from_queue = target.is_some();
        let folder = match target {
            Some(folder) => {
                if self.scanner.check(&folder, self.options.path_check).is_none() {
                    warn!("Dropping {} from the batch, it holds no playable media", folder.display());
                    self.pop_queue();
                    return Ok(self.finish(tag));
                }
                folder
            }
            None => match self.select_folder()? {
                Some(folder) => folder,
                None => {
                    info!("Folder selection cancelled");
                    return Ok(Step::Exit(ProvisionExit::SelectionCancelled));
                }
            },
        };

        if let Err(e) = tag.write_message(&ndef::encode_identifier(&id)) {
            return match e {
                Error::TagWriteFailed(_) => {
                    // nothing is committed yet; make sure it stays that way
                    self.registry.delete(&id)?;
                    error!("NDEF write failed: {}", e);
                    error!("You probably removed the tag before its UUID could be written.");
                    Ok(self.finish(tag))
                }
                other => Err(other),
            };
        }

        self.registry.insert(&id, &folder)?;
        info!("Successfully added entry to DB : {},{}", id, folder.display());
        self.written += 1;
        if from_queue {
            self.pop_queue();
        }

        if self.verify(tag, &id, &folder) {
            self.verified += 1;
        }

        info!("Done writing, please remove.");
        self.operator.announce("Done writing, please remove the tag.");
        Ok(self.finish(tag))
    }

    /// Batch mode turns a first interrupt into a question about the current
    /// folder: yes drops it, no keeps it queued. Another interrupt, pending
    /// or raised while the question is open, ends the run.
    fn on_interrupt(&mut self, target: Option<&Path>) -> Result<Step> {
        let Some(folder) = target else {
            return Ok(Step::Exit(ProvisionExit::Interrupted));
        };
        if self.interrupt.pending() >= 2 {
            return Ok(Step::Exit(ProvisionExit::Interrupted));
        }

        self.interrupt.acknowledge();
        let skip = self
            .operator
            .confirm(&format!("Skip {} and continue with the next folder?", folder.display()))?;

        if self.interrupt.is_raised() {
            info!("Aborting batch, {} stays queued", folder.display());
            return Ok(Step::Exit(ProvisionExit::Interrupted));
        }
        if skip {
            self.pop_queue();
            info!("Skipped {}", folder.display());
        } else {
            info!("Keeping {} queued", folder.display());
        }
        Ok(Step::Continue)
    }

    fn select_folder(&mut self) -> Result<Option<PathBuf>> {
        info!("Select media folder...");
        loop {
            let start = self
                .options
                .default_directory
                .clone()
                .or_else(|| self.last_pick_dir.clone());
            let Some(folder) = self.picker.pick(start.as_deref())? else {
                return Ok(None);
            };

            self.last_pick_dir = folder.parent().map(Path::to_path_buf);
            if self.scanner.check(&folder, self.options.path_check).is_some() {
                return Ok(Some(folder));
            }
            self.operator
                .announce(&format!("No playable media in {}, pick another folder", folder.display()));
        }
    }

    /// Reads the tag and the registry back. A mismatch is reported but the
    /// registration stays.
    fn verify(&mut self, tag: &mut R::Handle, id: &str, folder: &Path) -> bool {
        let on_tag = read_identifier(tag).ok().flatten();
        let registered = self.registry.lookup(id).ok();
        let expected = normalize_path(folder);

        if on_tag.as_deref() == Some(id) && registered.as_deref() == Some(expected.as_path()) {
            info!("Verified {} on tag and in registry", id);
            return true;
        }

        warn!(
            "Verification failed for {}: tag holds {:?}, registry holds {:?}",
            id, on_tag, registered
        );
        self.operator.announce("Could not verify the tag, please try it again.");
        false
    }

    fn pop_queue(&mut self) {
        if let Some(queue) = &mut self.queue {
            queue.pop();
        }
    }

    /// Waits for the tag to leave. In batch mode only a repeated interrupt
    /// cuts this short; a single one is handled at the next wait for a tag.
    fn finish(&self, tag: &R::Handle) -> Step {
        let abort_at = if self.queue.is_some() { 2 } else { 1 };
        if wait_for_removal(tag, &self.interrupt, self.options.removal_poll, abort_at) {
            Step::Continue
        } else {
            Step::Exit(ProvisionExit::Interrupted)
        }
    }
}
