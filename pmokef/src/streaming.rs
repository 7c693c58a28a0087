//! Audio streams handed to the speaker for playback.
//!
//! The speaker pulls audio over HTTP: either straight from an external URL or
//! from the caller's own HTTP server, through the [`StreamServer`]
//! collaborator. The URL given to the speaker must carry a file extension
//! matching the stream format, so only formats with a known extension are
//! accepted.

use std::fmt;
use std::time::Duration;

use crate::errors::{KefError, Result};

/// Container wrapping the encoded audio.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioContainer {
    Wave,
    Ogg,
    /// Raw elementary stream (MP3 frames, ADTS AAC...).
    None,
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioCodec {
    Pcm,
    Mp3,
    Aac,
    Vorbis,
    Flac,
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    pub container: AudioContainer,
    pub codec: AudioCodec,
}

impl AudioFormat {
    pub fn new(container: AudioContainer, codec: AudioCodec) -> Self {
        Self { container, codec }
    }

    pub fn wave() -> Self {
        Self::new(AudioContainer::Wave, AudioCodec::Pcm)
    }

    pub fn mp3() -> Self {
        Self::new(AudioContainer::None, AudioCodec::Mp3)
    }

    /// File extension the speaker expects for this format.
    ///
    /// The container decides when there is one; container-less streams are
    /// only accepted for MP3 and AAC.
    pub fn extension(&self) -> Result<&'static str> {
        match (&self.container, &self.codec) {
            (AudioContainer::Wave, _) => Ok("wav"),
            (AudioContainer::Ogg, _) => Ok("ogg"),
            (AudioContainer::None, AudioCodec::Mp3) => Ok("mp3"),
            (AudioContainer::None, AudioCodec::Aac) => Ok("aac"),
            _ => Err(KefError::unsupported_format(&self.to_string())),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let container = match &self.container {
            AudioContainer::Wave => "WAVE",
            AudioContainer::Ogg => "OGG",
            AudioContainer::None => "NONE",
            AudioContainer::Other(name) => name.as_str(),
        };
        let codec = match &self.codec {
            AudioCodec::Pcm => "PCM",
            AudioCodec::Mp3 => "MP3",
            AudioCodec::Aac => "AAC",
            AudioCodec::Vorbis => "VORBIS",
            AudioCodec::Flac => "FLAC",
            AudioCodec::Other(name) => name.as_str(),
        };
        write!(f, "{}/{}", container, codec)
    }
}

/// Where the speaker fetches the audio from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamSource {
    /// Already reachable by the speaker; the URL is used unchanged.
    External(String),
    /// Served by the caller's HTTP server. `length` is the payload size in
    /// bytes when known.
    Served { length: Option<u64> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioStream {
    /// Caller-side handle, passed back to the [`StreamServer`].
    pub id: String,
    pub format: AudioFormat,
    pub source: StreamSource,
}

impl AudioStream {
    pub fn external(url: impl Into<String>, format: AudioFormat) -> Self {
        let url = url.into();
        Self {
            id: url.clone(),
            format,
            source: StreamSource::External(url),
        }
    }

    pub fn served(id: impl Into<String>, format: AudioFormat, length: Option<u64>) -> Self {
        Self {
            id: id.into(),
            format,
            source: StreamSource::Served { length },
        }
    }
}

/// What the serving layer returns for a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServedStream {
    /// Path relative to the caller's base URL, without extension.
    pub relative_url: String,
    pub content_length: Option<u64>,
}

/// HTTP file-serving layer exposing local streams to the speaker.
pub trait StreamServer: Send + Sync {
    /// Makes `stream` reachable. With `retention`, the payload stays
    /// available that long after the first request so the speaker can
    /// re-fetch it.
    fn serve(&self, stream: &AudioStream, retention: Option<Duration>) -> Result<ServedStream>;
}

/// `base_url + relative_url + "." + extension`, concatenated as is.
pub fn stream_url(base_url: &str, relative_url: &str, extension: &str) -> String {
    format!("{}{}.{}", base_url, relative_url, extension)
}
