use std::fmt;

/// Device-side volume unit: 0..=127 is audible, 128 means muted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AmplitudeCode(pub u8);

impl AmplitudeCode {
    pub const MAX: u8 = 127;
    pub const MUTED: AmplitudeCode = AmplitudeCode(128);

    /// Clamps `percent` to [0, 100] and rounds to the nearest code.
    pub fn from_percent(percent: f32) -> Self {
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        AmplitudeCode((percent / 100.0 * Self::MAX as f32).round() as u8)
    }

    /// Volume percentage, or `None` for the mute sentinel and any other
    /// out-of-range code.
    pub fn to_percent(self) -> Option<f32> {
        if self.is_audible() {
            Some(self.0 as f32 / Self::MAX as f32 * 100.0)
        } else {
            None
        }
    }

    pub fn is_audible(self) -> bool {
        self.0 <= Self::MAX
    }
}

/// Source selected on the speaker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Input {
    #[default]
    Unknown,
    Network,
    Bluetooth,
    BluetoothDisconnected,
    Aux,
    Optical,
    Usb,
}

impl Input {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x12 => Input::Network,
            0x19 => Input::Bluetooth,
            0x1F => Input::BluetoothDisconnected,
            0x1A => Input::Aux,
            0x1B => Input::Optical,
            0x1C => Input::Usb,
            _ => Input::Unknown,
        }
    }

    /// Wire code, `None` for [`Input::Unknown`].
    pub fn code(self) -> Option<u8> {
        match self {
            Input::Unknown => None,
            Input::Network => Some(0x12),
            Input::Bluetooth => Some(0x19),
            Input::BluetoothDisconnected => Some(0x1F),
            Input::Aux => Some(0x1A),
            Input::Optical => Some(0x1B),
            Input::Usb => Some(0x1C),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Input::Unknown => "UNKNOWN",
            Input::Network => "NETWORK",
            Input::Bluetooth => "BLUETOOTH",
            Input::BluetoothDisconnected => "BLUETOOTH_DISCONNECTED",
            Input::Aux => "AUX",
            Input::Optical => "OPTICAL",
            Input::Usb => "USB",
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AVTransport `CurrentTransportState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TransportState {
    #[default]
    Unknown,
    Playing,
    Stopped,
    Transitioning,
    Recording,
    PausedRecording,
    PausedPlayback,
    NoMediaPresent,
}

impl TransportState {
    /// Map a raw UPnP AVTransport state string; anything unrecognized is
    /// [`TransportState::Unknown`].
    pub fn from_upnp_state(raw: &str) -> Self {
        let s = raw.trim().to_ascii_uppercase();
        match s.as_str() {
            "PLAYING" => TransportState::Playing,
            "STOPPED" => TransportState::Stopped,
            "TRANSITIONING" => TransportState::Transitioning,
            "RECORDING" => TransportState::Recording,
            "PAUSED_RECORDING" => TransportState::PausedRecording,
            "PAUSED_PLAYBACK" => TransportState::PausedPlayback,
            "NO_MEDIA_PRESENT" => TransportState::NoMediaPresent,
            _ => TransportState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportState::Unknown => "UNKNOWN",
            TransportState::Playing => "PLAYING",
            TransportState::Stopped => "STOPPED",
            TransportState::Transitioning => "TRANSITIONING",
            TransportState::Recording => "RECORDING",
            TransportState::PausedRecording => "PAUSED_RECORDING",
            TransportState::PausedPlayback => "PAUSED_PLAYBACK",
            TransportState::NoMediaPresent => "NO_MEDIA_PRESENT",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the speaker is currently playing. Either field may be missing.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MediaInfo {
    pub artist: Option<String>,
    pub title: Option<String>,
}

impl MediaInfo {
    pub fn is_empty(&self) -> bool {
        self.artist.is_none() && self.title.is_none()
    }
}

impl fmt::Display for MediaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Title: {} Artist: {}",
            self.title.as_deref().unwrap_or("-"),
            self.artist.as_deref().unwrap_or("-")
        )
    }
}
