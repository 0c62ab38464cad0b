//! Audio format types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Audio formats the catalog recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFormat {
    /// MP3 - MPEG Audio Layer 3
    Mp3,
    /// AAC in an MP4 container
    M4a,
    /// AAC in an M4B container (audiobook format)
    M4b,
    /// FLAC - Free Lossless Audio Codec
    Flac,
    /// OGG Vorbis
    Vorbis,
    /// Opus
    Opus,
    /// WAV - Waveform Audio File Format
    Wav,
    /// AIFF - Audio Interchange File Format
    Aiff,
    /// WMA - Windows Media Audio
    Wma,
    /// APE - Monkey's Audio
    Ape,
    /// WavPack
    WavPack,
}

impl AudioFormat {
    /// Returns all recognized formats
    pub fn all() -> Vec<Self> {
        vec![
            Self::Mp3,
            Self::M4a,
            Self::M4b,
            Self::Flac,
            Self::Vorbis,
            Self::Opus,
            Self::Wav,
            Self::Aiff,
            Self::Wma,
            Self::Ape,
            Self::WavPack,
        ]
    }

    /// Detects format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        match ext.as_str() {
            "mp3" => Some(Self::Mp3),
            "m4a" => Some(Self::M4a),
            "m4b" => Some(Self::M4b),
            "flac" => Some(Self::Flac),
            "ogg" | "oga" => Some(Self::Vorbis),
            "opus" => Some(Self::Opus),
            "wav" | "wave" => Some(Self::Wav),
            "aiff" | "aif" | "aifc" => Some(Self::Aiff),
            "wma" => Some(Self::Wma),
            "ape" => Some(Self::Ape),
            "wv" => Some(Self::WavPack),
            _ => None,
        }
    }

    /// Detects format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Returns the canonical file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::M4b => "m4b",
            Self::Flac => "flac",
            Self::Vorbis => "ogg",
            Self::Opus => "opus",
            Self::Wav => "wav",
            Self::Aiff => "aiff",
            Self::Wma => "wma",
            Self::Ape => "ape",
            Self::WavPack => "wv",
        }
    }

    /// Formats whose device-index metadata is historically unreliable
    ///
    /// Tracks in these formats are routed through the deep-scan pass even
    /// when no full rescan was requested.
    pub fn needs_deep_scan(&self) -> bool {
        matches!(
            self,
            Self::Opus | Self::Vorbis | Self::M4b | Self::Ape | Self::WavPack
        )
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mp3 => "MP3",
            Self::M4a => "M4A",
            Self::M4b => "M4B",
            Self::Flac => "FLAC",
            Self::Vorbis => "Vorbis",
            Self::Opus => "Opus",
            Self::Wav => "WAV",
            Self::Aiff => "AIFF",
            Self::Wma => "WMA",
            Self::Ape => "APE",
            Self::WavPack => "WavPack",
        };
        write!(f, "{}", name)
    }
}
