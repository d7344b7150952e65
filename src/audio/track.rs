use super::AudioFormat;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub file_path: PathBuf,
    pub format: AudioFormat,
}

impl Track {
    pub fn new(file_path: PathBuf) -> Self {
        let format = file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(AudioFormat::from_extension)
            .unwrap_or(AudioFormat::Unknown);

        Self { file_path, format }
    }

    pub fn display_title(&self) -> String {
        self.file_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("Unknown")
            .to_string()
    }

    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
