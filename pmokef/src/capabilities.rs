// pmokef/src/capabilities.rs
use crate::errors::Result;
use crate::model::{Input, MediaInfo, TransportState};

/// Volume and mute on a percentage scale.
pub trait VolumeControl {
    /// Current volume in [0, 100].
    fn volume(&self) -> Result<f32>;

    /// Sets the volume; out-of-range values are clamped.
    fn set_volume(&self, percent: f32) -> Result<()>;

    fn mute(&self) -> Result<bool>;

    /// Engages or releases mute. Releasing restores the volume captured when
    /// mute was engaged.
    fn set_mute(&self, muted: bool) -> Result<()>;
}

/// Source selection.
pub trait InputControl {
    fn input(&self) -> Result<Input>;

    /// Selects `input`; [`Input::Unknown`] is ignored.
    fn set_input(&self, input: Input) -> Result<()>;
}

/// Transport actions (AVTransport on KEF speakers).
pub trait TransportControl {
    /// Sets the resource to play (URI + metadata) and starts playback.
    fn play_uri(&self, uri: &str, meta: &str) -> Result<()>;

    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    /// Stops playback. Stopping an idle speaker succeeds.
    fn stop(&self) -> Result<()>;

    fn next(&self) -> Result<()>;

    fn previous(&self) -> Result<()>;
}

/// Read-only view of what the speaker is doing.
///
/// Failures are folded into the returned values: a speaker that cannot be
/// queried reports [`TransportState::Unknown`] and no media.
pub trait PlaybackStatus {
    fn playback_state(&self) -> TransportState;

    fn media_info(&self) -> Option<MediaInfo>;
}
