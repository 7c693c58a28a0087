use std::env;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use pmokef::{
    AudioCodec, AudioContainer, AudioFormat, AudioStream, KefConfig, KefRenderer, PlaybackStatus,
    ServedStream, StreamServer,
};

/// Used only when the demo is asked to play an external URL.
struct NoLocalServer;

impl StreamServer for NoLocalServer {
    fn serve(
        &self,
        stream: &AudioStream,
        _retention: Option<Duration>,
    ) -> pmokef::Result<ServedStream> {
        Err(pmokef::KefError::StreamServe(format!(
            "no local HTTP server to serve {}",
            stream.id
        )))
    }
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let mut args = env::args().skip(1);
    let Some(target) = args.next() else {
        bail!("usage: kef_demo <host | config.yaml> [stream-url]");
    };
    let stream_url = args.next();

    let config = if target.ends_with(".yaml") || target.ends_with(".yml") {
        KefConfig::from_file(&target)
    } else {
        KefConfig::new(target.as_str()).apply_env_overrides()
    }
    .with_context(|| format!("invalid configuration for {}", target))?;

    let speaker = KefRenderer::with_config(config)?;
    println!("Starting KEF demo for {}...", speaker.host());

    if !speaker.probe() {
        bail!("{} does not answer on its control port", speaker.host());
    }

    println!("    volume: {:.1}%", speaker.get_volume()?);
    println!("    muted:  {}", speaker.is_muted()?);
    println!("    input:  {}", speaker.get_input()?);
    println!("    state:  {}", speaker.playback_state());
    match speaker.media_info() {
        Some(info) if !info.is_empty() => println!("    media:  {}", info),
        Some(_) => println!("    media:  (nothing playing)"),
        None => println!("    media:  unavailable"),
    }

    println!("    toggling mute...");
    speaker.set_muted(true)?;
    thread::sleep(Duration::from_secs(1));
    speaker.set_muted(false)?;
    println!("    volume after un-mute: {:.1}%", speaker.get_volume()?);

    if let Some(url) = stream_url {
        let format = match url.rsplit('.').next() {
            Some("aac") => AudioFormat::new(AudioContainer::None, AudioCodec::Aac),
            Some("ogg") => AudioFormat::new(AudioContainer::Ogg, AudioCodec::Vorbis),
            Some("wav") => AudioFormat::wave(),
            _ => AudioFormat::mp3(),
        };
        println!("    streaming {} ({})", url, format);
        speaker.start_streaming(&AudioStream::external(url, format), "", &NoLocalServer)?;
        thread::sleep(Duration::from_secs(2));
        println!("    state:  {}", speaker.playback_state());
    }

    Ok(())
}
