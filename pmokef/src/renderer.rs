use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::avtransport_client::AvTransportClient;
use crate::capabilities::{InputControl, PlaybackStatus, TransportControl, VolumeControl};
use crate::command::{ChannelState, KefChannel, KefCommand};
use crate::config::KefConfig;
use crate::errors::Result;
use crate::kef_client::{Clock, KefTcpClient, SystemClock};
use crate::model::{AmplitudeCode, Input, MediaInfo, TransportState};
use crate::soap_client::SoapClient;
use crate::streaming::{AudioStream, StreamServer, StreamSource, stream_url};

/// State shared by every exchange with the speaker.
#[derive(Debug)]
struct Inner {
    tcp: KefTcpClient,
    /// Volume to restore on un-mute; only set while muted through this client.
    mute_backup: Option<f32>,
}

impl Inner {
    fn volume(&mut self) -> Result<f32> {
        let percent = self
            .tcp
            .query_volume()?
            .and_then(AmplitudeCode::to_percent)
            .unwrap_or(0.0);
        Ok(percent)
    }

    fn set_volume(&mut self, percent: f32) -> Result<()> {
        let code = AmplitudeCode::from_percent(percent);
        debug!("Setting KEF volume to {}% (code {})", percent, code.0);
        self.tcp.write_volume(code)
    }

    fn muted(&mut self) -> Result<bool> {
        Ok(matches!(self.tcp.query_volume()?, Some(code) if !code.is_audible()))
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        if muted {
            let backup = match self.tcp.query_volume()? {
                Some(code) if !code.is_audible() => {
                    debug!("KEF speaker already muted");
                    return Ok(());
                }
                code => code.and_then(AmplitudeCode::to_percent).unwrap_or(0.0),
            };
            self.tcp.write_volume(AmplitudeCode::MUTED)?;
            self.mute_backup = Some(backup);
            return Ok(());
        }

        let backup = self.mute_backup;
        match backup {
            Some(backup) => {
                self.set_volume(backup)?;
                self.mute_backup = None;
                Ok(())
            }
            None => {
                // Muted by someone else: nothing to restore, come back at zero.
                if self.muted()? {
                    self.tcp.write_volume(AmplitudeCode(0))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn input(&mut self) -> Result<Input> {
        Ok(self
            .tcp
            .query_input()?
            .map(Input::from_code)
            .unwrap_or_default())
    }

    fn set_input(&mut self, input: Input) -> Result<()> {
        match input.code() {
            Some(code) => self.tcp.write_input(code),
            None => {
                debug!("Ignoring request to select input {}", input);
                Ok(())
            }
        }
    }
}

/// Control client for one KEF LS50 Wireless speaker.
///
/// Volume, mute and input go through the binary control port, transport and
/// playback through UPnP AVTransport. All exchanges are serialized: only one
/// request (TCP or HTTP) is in flight per client, and successive TCP
/// connections are spaced by the configured minimum interval. That spacing
/// blocks the calling thread.
#[derive(Debug)]
pub struct KefRenderer {
    config: KefConfig,
    avtransport: AvTransportClient,
    inner: Mutex<Inner>,
}

impl KefRenderer {
    /// Client with default ports and timeouts.
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self::with_config(KefConfig::new(host))
    }

    pub fn with_config(config: KefConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Client whose connection pacing uses `clock`.
    pub fn with_clock(config: KefConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let config = config.validate()?;
        let soap = SoapClient::new(config.control_url(), config.http_timeout());
        let tcp = KefTcpClient::new(&config, clock);

        debug!(
            "KEF client for {} (control port {}, AVTransport {})",
            config.host,
            tcp.address(),
            soap.control_url()
        );

        Ok(Self {
            avtransport: AvTransportClient::new(soap),
            inner: Mutex::new(Inner {
                tcp,
                mute_backup: None,
            }),
            config,
        })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn config(&self) -> &KefConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Inner holds no invariant a panicking caller could break halfway.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True iff the binary control port accepts a connection.
    pub fn probe(&self) -> bool {
        self.lock().tcp.probe()
    }

    /// Volume in [0, 100]. A reply that is not a volume frame, or the mute
    /// sentinel, reads as 0.
    pub fn get_volume(&self) -> Result<f32> {
        self.lock().volume()
    }

    pub fn set_volume(&self, percent: f32) -> Result<()> {
        self.lock().set_volume(percent)
    }

    pub fn is_muted(&self) -> Result<bool> {
        self.lock().muted()
    }

    /// Muting saves the current volume; un-muting restores it.
    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.lock().set_muted(muted)
    }

    /// Selected input, [`Input::Unknown`] when the reply is unusable.
    pub fn get_input(&self) -> Result<Input> {
        self.lock().input()
    }

    /// Selects `input`. [`Input::Unknown`] is a no-op.
    pub fn set_input(&self, input: Input) -> Result<()> {
        self.lock().set_input(input)
    }

    pub fn play(&self) -> Result<()> {
        let _guard = self.lock();
        self.avtransport.play()
    }

    pub fn pause(&self) -> Result<()> {
        let _guard = self.lock();
        self.avtransport.pause()
    }

    /// Succeeds when the speaker was not playing anything.
    pub fn stop(&self) -> Result<()> {
        let _guard = self.lock();
        self.avtransport.stop()
    }

    pub fn next(&self) -> Result<()> {
        let _guard = self.lock();
        self.avtransport.next()
    }

    pub fn previous(&self) -> Result<()> {
        let _guard = self.lock();
        self.avtransport.previous()
    }

    /// [`TransportState::Unknown`] on any failure.
    pub fn get_transport_state(&self) -> TransportState {
        let _guard = self.lock();
        self.avtransport
            .get_transport_info()
            .unwrap_or(TransportState::Unknown)
    }

    /// `None` on any failure.
    pub fn get_media_info(&self) -> Option<MediaInfo> {
        let _guard = self.lock();
        self.avtransport.get_media_info().ok()
    }

    pub fn play_uri(&self, uri: &str, meta: &str) -> Result<()> {
        let _guard = self.lock();
        self.avtransport.set_av_transport_uri(uri, meta)?;
        self.avtransport.play()
    }

    /// Plays `stream` on the speaker.
    ///
    /// The format is checked before anything is sent. Then the current
    /// transport is stopped, the stream URL resolved (served streams go
    /// through `server` and get `base_url` as prefix), set as transport URI
    /// and played. The first failing step aborts the sequence; nothing is
    /// rolled back.
    ///
    /// `server` is called without the device lock held, so it may use this
    /// renderer.
    pub fn start_streaming(
        &self,
        stream: &AudioStream,
        base_url: &str,
        server: &dyn StreamServer,
    ) -> Result<()> {
        let extension = stream.format.extension().inspect_err(|err| {
            warn!("Cannot stream {} to {}: {}", stream.id, self.config.host, err)
        })?;

        info!(
            "Streaming {} ({}) to KEF speaker {}",
            stream.id, stream.format, self.config.host
        );

        {
            let _guard = self.lock();
            self.avtransport
                .stop()
                .inspect_err(|err| warn!("Streaming aborted, Stop failed: {}", err))?;
        }

        let url = match &stream.source {
            StreamSource::External(url) => url.clone(),
            StreamSource::Served { length } => {
                let retention = length.map(|_| self.config.stream_retention());
                let served = server.serve(stream, retention).inspect_err(|err| {
                    warn!("Streaming aborted, cannot serve {}: {}", stream.id, err)
                })?;
                debug!(
                    "{} served at {} ({} bytes)",
                    stream.id,
                    served.relative_url,
                    served
                        .content_length
                        .map_or_else(|| "unknown".to_string(), |len| len.to_string())
                );
                stream_url(base_url, &served.relative_url, extension)
            }
        };
        debug!("Stream URL for {}: {}", stream.id, url);

        let _guard = self.lock();
        self.avtransport
            .set_av_transport_uri(&url, "")
            .inspect_err(|err| warn!("Streaming aborted, SetAVTransportURI failed: {}", err))?;
        self.avtransport
            .play()
            .inspect_err(|err| warn!("Streaming aborted, Play failed: {}", err))
    }

    /// Runs `command` and reports the resulting channel state.
    ///
    /// Refreshing transport or media info never fails; the other commands
    /// return communication errors so the caller can take the speaker
    /// offline.
    pub fn handle_command(&self, command: KefCommand) -> Result<ChannelState> {
        debug!(
            "KEF {:?} command for {}: {:?}",
            command.channel(),
            self.config.host,
            command
        );
        let state = match command {
            KefCommand::Refresh(KefChannel::Volume) => ChannelState::Volume(self.get_volume()?),
            KefCommand::Refresh(KefChannel::Mute) => ChannelState::Mute(self.is_muted()?),
            KefCommand::Refresh(KefChannel::Input) => ChannelState::Input(self.get_input()?),
            KefCommand::Refresh(KefChannel::Transport) => {
                ChannelState::Transport(self.get_transport_state())
            }
            KefCommand::Refresh(KefChannel::MediaInfo) => {
                ChannelState::Media(self.get_media_info())
            }
            KefCommand::SetVolume(percent) => {
                self.set_volume(percent)?;
                ChannelState::Accepted
            }
            KefCommand::SetMute(muted) => {
                self.set_muted(muted)?;
                ChannelState::Accepted
            }
            KefCommand::SetInput(input) => {
                self.set_input(input)?;
                ChannelState::Accepted
            }
            KefCommand::Play => {
                self.play()?;
                ChannelState::Accepted
            }
            KefCommand::Pause => {
                self.pause()?;
                ChannelState::Accepted
            }
            KefCommand::Stop => {
                self.stop()?;
                ChannelState::Accepted
            }
            KefCommand::Next => {
                self.next()?;
                ChannelState::Accepted
            }
            KefCommand::Previous => {
                self.previous()?;
                ChannelState::Accepted
            }
        };
        Ok(state)
    }
}

impl VolumeControl for KefRenderer {
    fn volume(&self) -> Result<f32> {
        self.get_volume()
    }

    fn set_volume(&self, percent: f32) -> Result<()> {
        KefRenderer::set_volume(self, percent)
    }

    fn mute(&self) -> Result<bool> {
        self.is_muted()
    }

    fn set_mute(&self, muted: bool) -> Result<()> {
        self.set_muted(muted)
    }
}

impl InputControl for KefRenderer {
    fn input(&self) -> Result<Input> {
        self.get_input()
    }

    fn set_input(&self, input: Input) -> Result<()> {
        KefRenderer::set_input(self, input)
    }
}

impl TransportControl for KefRenderer {
    fn play_uri(&self, uri: &str, meta: &str) -> Result<()> {
        KefRenderer::play_uri(self, uri, meta)
    }

    fn play(&self) -> Result<()> {
        KefRenderer::play(self)
    }

    fn pause(&self) -> Result<()> {
        KefRenderer::pause(self)
    }

    fn stop(&self) -> Result<()> {
        KefRenderer::stop(self)
    }

    fn next(&self) -> Result<()> {
        KefRenderer::next(self)
    }

    fn previous(&self) -> Result<()> {
        KefRenderer::previous(self)
    }
}

impl PlaybackStatus for KefRenderer {
    fn playback_state(&self) -> TransportState {
        self.get_transport_state()
    }

    fn media_info(&self) -> Option<MediaInfo> {
        self.get_media_info()
    }
}
