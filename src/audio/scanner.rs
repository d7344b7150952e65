use super::{classify, is_audio_track, FileClass, Track};
use crate::config::PathCheck;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Expands a media path into the ordered list of tracks the engine gets.
/// Only the top level of a folder is considered, in file name order.
#[derive(Clone, Debug, Default)]
pub struct MediaScanner;

impl MediaScanner {
    pub fn new() -> Self {
        Self
    }

    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Track>> {
        let path = path.as_ref();

        if path.is_file() {
            return Ok(vec![Track::new(path.to_path_buf())]);
        }
        if !path.is_dir() {
            return Err(Error::MissingMedia(path.to_path_buf()));
        }

        let tracks: Vec<Track> = self
            .entries(path)
            .filter(|p| is_audio_track(p))
            .map(Track::new)
            .collect();

        debug!("Scanned {}: {} tracks", path.display(), tracks.len());
        Ok(tracks)
    }

    /// Number of tracks under `path`, or None if the path would not be accepted
    /// under `check`.
    pub fn check(&self, path: &Path, check: PathCheck) -> Option<usize> {
        if !path.exists() {
            warn!("Path does not exist: {}", path.display());
            return None;
        }

        let tracks = if path.is_file() {
            usize::from(is_audio_track(path))
        } else {
            self.load(path).map(|t| t.len()).unwrap_or(0)
        };

        match (tracks, check) {
            (0, PathCheck::Audio) => {
                warn!("No tracks found in {}", path.display());
                None
            }
            (n, _) => {
                info!("Found {} tracks in {}", n, path.display());
                Some(n)
            }
        }
    }

    /// First playlist container in the folder, by name.
    pub fn find_playlist(&self, path: &Path) -> Option<PathBuf> {
        self.entries(path)
            .find(|p| classify(p) == FileClass::Playlist)
    }

    fn entries<'a>(&self, dir: &'a Path) -> impl Iterator<Item = PathBuf> + 'a {
        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            // Skip hidden files (dotfiles, AppleDouble leftovers)
            .filter(|entry| {
                !entry
                    .file_name()
                    .to_str()
                    .map_or(false, |n| n.starts_with('.'))
            })
            .map(|entry| entry.into_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn album(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            fs::write(dir.path().join(name), b"data").unwrap();
        }
        dir
    }

    #[test]
    fn test_load_orders_and_filters() {
        let dir = album(&["02 b.mp3", "cover.jpg", "01 a.flac", "list.m3u", ".03 hidden.mp3", "03 c.ogg"]);
        fs::create_dir(dir.path().join("bonus")).unwrap();
        fs::write(dir.path().join("bonus").join("04 d.mp3"), b"data").unwrap();

        let tracks = MediaScanner::new().load(dir.path()).unwrap();
        let names: Vec<String> = tracks.iter().map(|t| t.file_name()).collect();
        assert_eq!(names, vec!["01 a.flac", "02 b.mp3", "03 c.ogg"]);
    }

    #[test]
    fn test_load_single_file() {
        let dir = album(&["single.mp3"]);
        let tracks = MediaScanner::new().load(dir.path().join("single.mp3")).unwrap();
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn test_load_missing_path() {
        let err = MediaScanner::new().load("/definitely/not/here").unwrap_err();
        assert!(matches!(err, Error::MissingMedia(_)));
    }

    #[test]
    fn test_check_modes() {
        let scanner = MediaScanner::new();
        let empty = album(&["notes.txt"]);
        assert_eq!(scanner.check(empty.path(), PathCheck::Audio), None);
        assert_eq!(scanner.check(empty.path(), PathCheck::Exists), Some(0));

        let full = album(&["a.mp3", "b.wav"]);
        assert_eq!(scanner.check(full.path(), PathCheck::Audio), Some(2));
        assert_eq!(scanner.check(&full.path().join("a.mp3"), PathCheck::Audio), Some(1));
        assert_eq!(scanner.check(Path::new("/nope/nope"), PathCheck::Exists), None);
    }

    #[test]
    fn test_find_playlist() {
        let dir = album(&["b.cue", "a.m3u", "x.mp3"]);
        let found = MediaScanner::new().find_playlist(dir.path()).unwrap();
        assert!(found.ends_with("a.m3u"));
    }
}
