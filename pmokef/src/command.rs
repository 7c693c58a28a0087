use crate::model::{Input, MediaInfo, TransportState};

/// State the speaker can be asked to report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KefChannel {
    Volume,
    Mute,
    Input,
    Transport,
    MediaInfo,
}

/// Commands routed to a speaker by the orchestration layer.
#[derive(Clone, Debug, PartialEq)]
pub enum KefCommand {
    Refresh(KefChannel),
    SetVolume(f32),
    SetMute(bool),
    SetInput(Input),
    Play,
    Pause,
    Stop,
    Next,
    Previous,
}

/// Outcome of a [`KefCommand`]: the refreshed value, or `Accepted` for
/// commands that only change state.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelState {
    Volume(f32),
    Mute(bool),
    Input(Input),
    Transport(TransportState),
    Media(Option<MediaInfo>),
    Accepted,
}

impl KefCommand {
    /// Channel whose value this command reads or changes.
    pub fn channel(&self) -> KefChannel {
        match self {
            KefCommand::Refresh(channel) => *channel,
            KefCommand::SetVolume(_) => KefChannel::Volume,
            KefCommand::SetMute(_) => KefChannel::Mute,
            KefCommand::SetInput(_) => KefChannel::Input,
            KefCommand::Play
            | KefCommand::Pause
            | KefCommand::Stop
            | KefCommand::Next
            | KefCommand::Previous => KefChannel::Transport,
        }
    }
}
