use super::{TagHandle, TagReader};
use crate::config::ReaderConfig;
use crate::control::Interrupt;
use crate::error::{Error, Result};
use std::cell::Cell;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const TAG_FILE: &str = "tag";
const PROBE_FILE: &str = "probe";

/// Reader backed by a directory. A tag is in the field while `<dir>/tag`
/// exists; its bytes are the tag's NDEF message, and an empty file is a
/// tag without NDEF data.
pub struct SpoolReader {
    dir: PathBuf,
    poll_interval: Duration,
    probe: Option<Vec<u8>>,
    started: bool,
}

impl SpoolReader {
    /// Opens the reader named by `config.location` (`spool:<dir>` or a bare
    /// directory), retrying before giving up with `DeviceUnavailable`.
    pub fn connect(config: &ReaderConfig) -> Result<Self> {
        let location = config.location.as_str();
        let dir = PathBuf::from(location.strip_prefix("spool:").unwrap_or(location));
        let attempts = config.connect_attempts.max(1);

        for attempt in 1..=attempts {
            if dir.is_dir() {
                info!("Connected to tag reader at {}", dir.display());
                return Ok(Self {
                    dir,
                    poll_interval: config.poll_interval(),
                    probe: config.probe_bytes(),
                    started: false,
                });
            }
            warn!("No reader at {} (attempt {}/{})", location, attempt, attempts);
            if attempt < attempts {
                thread::sleep(config.connect_retry());
            }
        }

        Err(Error::DeviceUnavailable { location: location.to_string(), attempts })
    }

    /// Startup hook: publish the discovery probe before the first poll.
    fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        if let Some(probe) = &self.probe {
            let encoded = hex::encode_upper(probe);
            fs::write(self.dir.join(PROBE_FILE), &encoded)?;
            debug!("Discovery probe {}", encoded);
        }
        self.started = true;
        Ok(())
    }
}

impl TagReader for SpoolReader {
    type Handle = SpoolTag;

    fn wait_for_tag(&mut self, interrupt: &Interrupt) -> Result<Option<SpoolTag>> {
        self.start()?;
        let path = self.dir.join(TAG_FILE);

        loop {
            if interrupt.is_raised() {
                return Ok(None);
            }
            if path.is_file() {
                debug!("Connected to tag {}", path.display());
                return Ok(Some(SpoolTag::attach(path)));
            }
            thread::sleep(self.poll_interval);
        }
    }
}

pub struct SpoolTag {
    path: PathBuf,
    present: Cell<bool>,
}

impl SpoolTag {
    fn attach(path: PathBuf) -> Self {
        Self { path, present: Cell::new(true) }
    }
}

impl TagHandle for SpoolTag {
    fn is_present(&self) -> bool {
        if !self.present.get() {
            return false;
        }
        let here = self.path.is_file();
        self.present.set(here);
        here
    }

    fn read_message(&mut self) -> Result<Option<Vec<u8>>> {
        if !self.is_present() {
            return Err(Error::NoTag);
        }
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.present.set(false);
                Err(Error::NoTag)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_message(&mut self, message: &[u8]) -> Result<()> {
        if !self.is_present() {
            return Err(Error::TagWriteFailed("tag is no longer present".into()));
        }
        // never create: a vanished tag must not be resurrected by the write
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| {
                self.present.set(false);
                Error::TagWriteFailed(e.to_string())
            })?;
        file.write_all(message)
            .and_then(|_| file.sync_all())
            .map_err(|e| Error::TagWriteFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn reader_config(dir: &Path) -> ReaderConfig {
        ReaderConfig {
            location: format!("spool:{}", dir.display()),
            connect_attempts: 2,
            connect_retry_ms: 1,
            poll_interval_ms: 1,
            ..ReaderConfig::default()
        }
    }

    #[test]
    fn test_missing_reader_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = reader_config(&dir.path().join("absent"));
        let err = SpoolReader::connect(&config).err().unwrap();
        assert!(matches!(err, Error::DeviceUnavailable { attempts: 2, .. }));
    }

    #[test]
    fn test_interrupted_wait() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = SpoolReader::connect(&reader_config(dir.path())).unwrap();
        let interrupt = Interrupt::new();
        interrupt.raise();
        assert!(reader.wait_for_tag(&interrupt).unwrap().is_none());
        assert_eq!(fs::read_to_string(dir.path().join(PROBE_FILE)).unwrap(), "0012FC0000");
    }

    #[test]
    fn test_probe_is_written_upper_case() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReaderConfig { probe: " 0a0bff ".into(), ..reader_config(dir.path()) };
        let mut reader = SpoolReader::connect(&config).unwrap();
        let interrupt = Interrupt::new();
        interrupt.raise();
        reader.wait_for_tag(&interrupt).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join(PROBE_FILE)).unwrap(), "0A0BFF");
    }

    #[test]
    fn test_invalid_probe_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReaderConfig { probe: "not hex".into(), ..reader_config(dir.path()) };
        let mut reader = SpoolReader::connect(&config).unwrap();
        let interrupt = Interrupt::new();
        interrupt.raise();
        reader.wait_for_tag(&interrupt).unwrap();
        assert!(!dir.path().join(PROBE_FILE).exists());
    }

    #[test]
    fn test_read_write_and_removal() {
        let dir = tempfile::tempdir().unwrap();
        let tag_path = dir.path().join(TAG_FILE);
        fs::write(&tag_path, b"").unwrap();

        let mut reader = SpoolReader::connect(&reader_config(dir.path())).unwrap();
        let mut tag = reader.wait_for_tag(&Interrupt::new()).unwrap().unwrap();
        assert!(tag.is_present());
        assert_eq!(tag.read_message().unwrap(), None);

        tag.write_message(&[0xD0, 0x00, 0x00]).unwrap();
        assert_eq!(tag.read_message().unwrap(), Some(vec![0xD0, 0x00, 0x00]));

        fs::remove_file(&tag_path).unwrap();
        assert!(!tag.is_present());
        assert!(matches!(tag.read_message(), Err(Error::NoTag)));
        assert!(matches!(tag.write_message(b"x"), Err(Error::TagWriteFailed(_))));
        assert!(!tag_path.exists());

        // a new tag file does not revive the old handle
        fs::write(&tag_path, b"").unwrap();
        assert!(!tag.is_present());
    }
}
