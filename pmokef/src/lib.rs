//! Control client for KEF LS50 Wireless speakers.
//!
//! Two protocols are involved:
//! - a binary request/response protocol on TCP port 50001 for volume, mute
//!   and input selection ([`kef_client`]);
//! - UPnP AVTransport over SOAP/HTTP for transport control, media info and
//!   stream playback ([`avtransport_client`]).
//!
//! [`KefRenderer`] puts both behind one thread-safe facade.
//!
//! ```no_run
//! use pmokef::{Input, KefRenderer};
//!
//! let speaker = KefRenderer::new("192.168.1.42")?;
//! speaker.set_input(Input::Network)?;
//! speaker.set_volume(35.0)?;
//! println!("{}", speaker.get_transport_state());
//! # Ok::<(), pmokef::KefError>(())
//! ```

pub mod avtransport_client;
pub mod capabilities;
pub mod command;
pub mod config;
pub mod errors;
pub mod kef_client;
pub mod model;
pub mod renderer;
pub mod soap;
pub mod soap_client;
pub mod streaming;

pub use avtransport_client::AvTransportClient;
pub use capabilities::{InputControl, PlaybackStatus, TransportControl, VolumeControl};
pub use command::{ChannelState, KefChannel, KefCommand};
pub use config::KefConfig;
pub use errors::{KefError, Result};
pub use kef_client::{Clock, KefTcpClient, SystemClock};
pub use model::{AmplitudeCode, Input, MediaInfo, TransportState};
pub use renderer::KefRenderer;
pub use soap_client::SoapClient;
pub use streaming::{
    AudioCodec, AudioContainer, AudioFormat, AudioStream, ServedStream, StreamServer,
    StreamSource,
};
