use std::io::BufReader;

use tracing::{debug, warn};
use xmltree::Element;

use crate::errors::{KefError, Result};
use crate::model::{MediaInfo, TransportState};
use crate::soap::{SoapEnvelope, child_text, error_codes, find_child_with_suffix, find_descendant_with_suffix};
use crate::soap_client::{SoapClient, ensure_success, require_envelope};

pub const AVTRANSPORT_SERVICE_TYPE: &str = "urn:schemas-upnp-org:service:AVTransport:1";

/// KEF speakers expose a single AVTransport instance.
const INSTANCE_ID: &str = "0";

/// AVTransport:1 actions used to drive the speaker.
#[derive(Debug, Clone)]
pub struct AvTransportClient {
    soap: SoapClient,
    service_type: String,
}

impl AvTransportClient {
    pub fn new(soap: SoapClient) -> Self {
        Self {
            soap,
            service_type: AVTRANSPORT_SERVICE_TYPE.to_string(),
        }
    }

    pub fn control_url(&self) -> &str {
        self.soap.control_url()
    }

    /// AVTransport:1 SetAVTransportURI
    pub fn set_av_transport_uri(&self, uri: &str, meta: &str) -> Result<()> {
        let args = [
            ("InstanceID", INSTANCE_ID),
            ("CurrentURI", uri),
            ("CurrentURIMetaData", meta),
        ];
        self.run_action("SetAVTransportURI", &args)
    }

    /// AVTransport:1 Play
    pub fn play(&self) -> Result<()> {
        self.run_action("Play", &[("InstanceID", INSTANCE_ID), ("Speed", "1")])
    }

    /// AVTransport:1 Pause
    pub fn pause(&self) -> Result<()> {
        self.run_action("Pause", &[("InstanceID", INSTANCE_ID)])
    }

    /// AVTransport:1 Stop
    ///
    /// Error 701 (transition not available) means nothing was playing and is
    /// reported as success.
    pub fn stop(&self) -> Result<()> {
        match self.call("Stop", &[("InstanceID", INSTANCE_ID)]) {
            Err(KefError::SoapFault {
                error_code: Some(error_codes::TRANSITION_NOT_AVAILABLE),
                ..
            }) => {
                debug!("Stop on {}: nothing was playing", self.control_url());
                Ok(())
            }
            other => other.inspect_err(|err| warn!("Stop failed: {}", err)),
        }
    }

    /// AVTransport:1 Next
    pub fn next(&self) -> Result<()> {
        self.run_action("Next", &[("InstanceID", INSTANCE_ID)])
    }

    /// AVTransport:1 Previous
    pub fn previous(&self) -> Result<()> {
        self.run_action("Previous", &[("InstanceID", INSTANCE_ID)])
    }

    /// AVTransport:1 GetTransportInfo
    pub fn get_transport_info(&self) -> Result<TransportState> {
        let action = "GetTransportInfo";
        let call_result = self
            .soap
            .invoke_upnp_action(&self.service_type, action, &[("InstanceID", INSTANCE_ID)])
            .inspect_err(|err| warn!("{} failed: {}", action, err))?;
        let envelope =
            require_envelope(action, &call_result).inspect_err(|err| warn!("{} failed: {}", action, err))?;
        Ok(parse_transport_state(envelope))
    }

    /// AVTransport:1 GetMediaInfo
    pub fn get_media_info(&self) -> Result<MediaInfo> {
        let action = "GetMediaInfo";
        let call_result = self
            .soap
            .invoke_upnp_action(&self.service_type, action, &[("InstanceID", INSTANCE_ID)])
            .inspect_err(|err| warn!("{} failed: {}", action, err))?;
        let envelope =
            require_envelope(action, &call_result).inspect_err(|err| warn!("{} failed: {}", action, err))?;
        parse_media_info(envelope).inspect_err(|err| warn!("{} failed: {}", action, err))
    }

    fn call(&self, action: &str, args: &[(&str, &str)]) -> Result<()> {
        let call_result = self.soap.invoke_upnp_action(&self.service_type, action, args)?;
        ensure_success(action, &call_result)
    }

    fn run_action(&self, action: &str, args: &[(&str, &str)]) -> Result<()> {
        self.call(action, args)
            .inspect_err(|err| warn!("{} failed: {}", action, err))
    }
}

/// `CurrentTransportState` of a GetTransportInfo response.
///
/// A missing element yields [`TransportState::Unknown`].
pub fn parse_transport_state(envelope: &SoapEnvelope) -> TransportState {
    let response = find_child_with_suffix(&envelope.body.content, "GetTransportInfoResponse")
        .unwrap_or(&envelope.body.content);

    match child_text(response, "CurrentTransportState") {
        Some(raw) => {
            let state = TransportState::from_upnp_state(&raw);
            if state == TransportState::Unknown {
                debug!("Unrecognized transport state: {}", raw);
            }
            state
        }
        None => TransportState::Unknown,
    }
}

/// Artist and title from the DIDL-Lite `CurrentURIMetaData` of a
/// GetMediaInfo response.
///
/// Missing or `NOT_IMPLEMENTED` metadata gives an empty [`MediaInfo`];
/// metadata that is not valid XML is a parse error.
pub fn parse_media_info(envelope: &SoapEnvelope) -> Result<MediaInfo> {
    let response = find_child_with_suffix(&envelope.body.content, "GetMediaInfoResponse")
        .unwrap_or(&envelope.body.content);

    let Some(metadata) = child_text(response, "CurrentURIMetaData") else {
        return Ok(MediaInfo::default());
    };
    if metadata == "NOT_IMPLEMENTED" {
        return Ok(MediaInfo::default());
    }

    let didl = Element::parse(BufReader::new(metadata.as_bytes())).map_err(|e| {
        KefError::ParsingError(format!("Invalid DIDL-Lite in CurrentURIMetaData: {}", e))
    })?;

    let item = find_descendant_with_suffix(&didl, "item").unwrap_or(&didl);

    Ok(MediaInfo {
        artist: element_text(item, "artist").or_else(|| element_text(item, "creator")),
        title: element_text(item, "title"),
    })
}

fn element_text(parent: &Element, name: &str) -> Option<String> {
    parent
        .children
        .iter()
        .filter_map(|node| node.as_element())
        .find(|elem| elem.name == name)
        .and_then(|elem| elem.get_text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::parse_soap_envelope;

    fn envelope(body: &str) -> SoapEnvelope {
        let xml = format!(
            r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>{}</s:Body>
</s:Envelope>"#,
            body
        );
        parse_soap_envelope(xml.as_bytes()).unwrap()
    }

    #[test]
    fn parse_transport_state_extracts_field() {
        let env = envelope(
            r#"<u:GetTransportInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">
                 <CurrentTransportState>PAUSED_PLAYBACK</CurrentTransportState>
                 <CurrentTransportStatus>OK</CurrentTransportStatus>
                 <CurrentSpeed>1</CurrentSpeed>
               </u:GetTransportInfoResponse>"#,
        );
        assert_eq!(parse_transport_state(&env), TransportState::PausedPlayback);
    }

    #[test]
    fn parse_transport_state_missing_or_unknown() {
        let env = envelope(
            r#"<u:GetTransportInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1"/>"#,
        );
        assert_eq!(parse_transport_state(&env), TransportState::Unknown);

        let env = envelope(
            r#"<u:GetTransportInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">
                 <CurrentTransportState>WARMING_UP</CurrentTransportState>
               </u:GetTransportInfoResponse>"#,
        );
        assert_eq!(parse_transport_state(&env), TransportState::Unknown);
    }

    #[test]
    fn parse_media_info_reads_didl() {
        let env = envelope(
            r#"<u:GetMediaInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">
                 <NrTracks>1</NrTracks>
                 <CurrentURI>http://10.0.0.2/track.flac</CurrentURI>
                 <CurrentURIMetaData>&lt;DIDL-Lite xmlns=&quot;urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/&quot; xmlns:dc=&quot;http://purl.org/dc/elements/1.1/&quot; xmlns:upnp=&quot;urn:schemas-upnp-org:metadata-1-0/upnp/&quot;&gt;&lt;item id=&quot;1&quot;&gt;&lt;dc:title&gt;Teardrop&lt;/dc:title&gt;&lt;upnp:artist&gt;Massive Attack&lt;/upnp:artist&gt;&lt;upnp:album&gt;Mezzanine&lt;/upnp:album&gt;&lt;/item&gt;&lt;/DIDL-Lite&gt;</CurrentURIMetaData>
               </u:GetMediaInfoResponse>"#,
        );
        let info = parse_media_info(&env).unwrap();
        assert_eq!(info.title.as_deref(), Some("Teardrop"));
        assert_eq!(info.artist.as_deref(), Some("Massive Attack"));
    }

    #[test]
    fn parse_media_info_falls_back_to_creator() {
        let env = envelope(
            r#"<u:GetMediaInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">
                 <CurrentURIMetaData>&lt;DIDL-Lite xmlns:dc=&quot;http://purl.org/dc/elements/1.1/&quot;&gt;&lt;item&gt;&lt;dc:creator&gt;Nina Simone&lt;/dc:creator&gt;&lt;/item&gt;&lt;/DIDL-Lite&gt;</CurrentURIMetaData>
               </u:GetMediaInfoResponse>"#,
        );
        let info = parse_media_info(&env).unwrap();
        assert_eq!(info.artist.as_deref(), Some("Nina Simone"));
        assert_eq!(info.title, None);
    }

    #[test]
    fn parse_media_info_without_metadata() {
        let env = envelope(
            r#"<u:GetMediaInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">
                 <CurrentURIMetaData></CurrentURIMetaData>
               </u:GetMediaInfoResponse>"#,
        );
        assert!(parse_media_info(&env).unwrap().is_empty());

        let env = envelope(
            r#"<u:GetMediaInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">
                 <CurrentURIMetaData>NOT_IMPLEMENTED</CurrentURIMetaData>
               </u:GetMediaInfoResponse>"#,
        );
        assert!(parse_media_info(&env).unwrap().is_empty());
    }

    #[test]
    fn parse_media_info_rejects_malformed_metadata() {
        let env = envelope(
            r#"<u:GetMediaInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">
                 <CurrentURIMetaData>&lt;DIDL-Lite&gt;&lt;item&gt;</CurrentURIMetaData>
               </u:GetMediaInfoResponse>"#,
        );
        assert!(matches!(parse_media_info(&env), Err(KefError::ParsingError(_))));
    }
}
