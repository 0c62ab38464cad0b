//! MIME type lookup

use crate::AudioFormat;
use std::path::Path;

/// Returns the MIME type for a given audio format
pub fn mime_type(format: AudioFormat) -> &'static str {
    match format {
        AudioFormat::Mp3 => "audio/mpeg",
        AudioFormat::M4a | AudioFormat::M4b => "audio/mp4",
        AudioFormat::Flac => "audio/flac",
        AudioFormat::Vorbis => "audio/ogg",
        AudioFormat::Opus => "audio/opus",
        AudioFormat::Wav => "audio/wav",
        AudioFormat::Aiff => "audio/aiff",
        AudioFormat::Wma => "audio/x-ms-wma",
        AudioFormat::Ape => "audio/x-ape",
        AudioFormat::WavPack => "audio/x-wavpack",
    }
}

/// Returns the MIME type for a path, if its extension is recognized
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    AudioFormat::from_path(path).map(mime_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type(AudioFormat::Mp3), "audio/mpeg");
        assert_eq!(mime_type(AudioFormat::M4b), "audio/mp4");
        assert_eq!(mime_type(AudioFormat::Opus), "audio/opus");
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(
            mime_for_path(&PathBuf::from("/a/b.flac")),
            Some("audio/flac")
        );
        assert_eq!(mime_for_path(&PathBuf::from("/a/b.txt")), None);
    }

    #[test]
    fn test_every_format_has_mime() {
        for format in AudioFormat::all() {
            assert!(mime_type(format).starts_with("audio/"));
        }
    }
}
