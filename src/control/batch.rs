use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Folders waiting for a tag, handed out from the end of the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchQueue {
    items: Vec<PathBuf>,
}

impl BatchQueue {
    /// One path per line. Blank lines and paths that do not exist are skipped.
    pub fn load(list: &Path) -> Result<Self> {
        let content = fs::read_to_string(list)?;
        let mut items = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let path = PathBuf::from(line);
            if path.exists() {
                items.push(path);
            } else {
                debug!("Skipping missing batch entry {}", line);
            }
        }

        info!("Loaded {} folders from {}", items.len(), list.display());
        Ok(Self { items })
    }

    pub fn from_paths(items: Vec<PathBuf>) -> Self {
        Self { items }
    }

    /// The folder the next tag will be bound to.
    pub fn current(&self) -> Option<&Path> {
        self.items.last().map(PathBuf::as_path)
    }

    pub fn pop(&mut self) -> Option<PathBuf> {
        self.items.pop()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_skips_missing_and_pops_from_end() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();

        let list = dir.path().join("batch.txt");
        fs::write(
            &list,
            format!("{}\n\n/definitely/missing\n  {}  \n", a.display(), b.display()),
        )
        .unwrap();

        let mut queue = BatchQueue::load(&list).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.current(), Some(b.as_path()));
        assert_eq!(queue.pop(), Some(b));
        assert_eq!(queue.pop(), Some(a));
        assert!(queue.is_empty());
        assert_eq!(queue.current(), None);
    }

    #[test]
    fn test_missing_list_file_is_error() {
        assert!(BatchQueue::load(Path::new("/no/such/list.txt")).is_err());
    }
}
