use std::{fmt, time::Duration};

use tracing::{debug, warn};
use ureq::Agent;
use ureq::http::StatusCode;

use crate::errors::{KefError, Result};
use crate::soap::{SoapEnvelope, SoapFault, build_soap_request, contains_fault_tag, parse_soap_envelope};

/// Result of a SOAP call:
/// - HTTP status code
/// - raw XML body (always)
/// - parsed SOAP envelope if parsing succeeded
#[derive(Debug)]
pub struct SoapCallResult {
    pub status: StatusCode,
    pub raw_body: String,
    pub envelope: Option<SoapEnvelope>,
}

impl SoapCallResult {
    /// The fault carried by the response, if any.
    ///
    /// Falls back to a raw-text scan when the body is not a well-formed
    /// envelope, in which case no code or description is available.
    pub fn fault(&self) -> Option<SoapFault> {
        match &self.envelope {
            Some(envelope) => SoapFault::from_envelope(envelope),
            None if contains_fault_tag(&self.raw_body) => Some(SoapFault {
                fault_code: None,
                fault_string: None,
                upnp_error: None,
            }),
            None => None,
        }
    }
}

/// HTTP side of the UPnP control channel: POSTs SOAP envelopes to a single
/// control URL.
#[derive(Clone)]
pub struct SoapClient {
    agent: Agent,
    control_url: String,
}

impl fmt::Debug for SoapClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoapClient")
            .field("control_url", &self.control_url)
            .finish()
    }
}

impl SoapClient {
    pub fn new(control_url: impl Into<String>, timeout: Duration) -> Self {
        // 4xx/5xx must not become errors: SOAP faults come back as HTTP 500
        // and their body is needed.
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();

        Self {
            agent: config.into(),
            control_url: control_url.into(),
        }
    }

    pub fn control_url(&self) -> &str {
        &self.control_url
    }

    /// Invoke a UPnP SOAP action on the control URL.
    ///
    /// - `service_type`: service URN, e.g. "urn:schemas-upnp-org:service:AVTransport:1"
    /// - `action`: action name, e.g. "GetTransportInfo"
    /// - `args`: list of (name, value) pairs, e.g. &[("InstanceID", "0")]
    pub fn invoke_upnp_action(
        &self,
        service_type: &str,
        action: &str,
        args: &[(&str, &str)],
    ) -> Result<SoapCallResult> {
        let body_xml = build_soap_request(service_type, action, args).map_err(|e| {
            KefError::ParsingError(format!("Failed to build SOAP request for {}: {}", action, e))
        })?;

        let soap_action_header = format!(r#""{}#{}""#, service_type, action);
        debug!("SOAP {} -> {}", action, self.control_url);

        let mut response = self
            .agent
            .post(&self.control_url)
            .header("Content-Type", r#"text/xml; charset="utf-8""#)
            .header("Soapaction", &soap_action_header)
            .header("Accept-Encoding", "identity")
            .send(body_xml)
            .map_err(|e| {
                warn!("No HTTP response for {} from {}: {}", action, self.control_url, e);
                KefError::Http(format!(
                    "HTTP error when sending {} to {}: {}",
                    action, self.control_url, e
                ))
            })?;

        let status = response.status();

        let raw_body = response.body_mut().read_to_string().map_err(|e| {
            warn!("Unreadable {} response from {}: {}", action, self.control_url, e);
            KefError::Http(format!("Failed to read {} response body: {}", action, e))
        })?;

        // A body that is not a SOAP envelope is kept as raw text; callers
        // decide whether they needed the parsed form.
        let envelope = match parse_soap_envelope(raw_body.as_bytes()) {
            Ok(env) => Some(env),
            Err(err) => {
                debug!("{} response is not a SOAP envelope: {}", action, err);
                None
            }
        };

        Ok(SoapCallResult {
            status,
            raw_body,
            envelope,
        })
    }
}

/// Turns a fault or an HTTP error status into an error.
///
/// Faults are only logged at debug level: some are expected (see
/// [`crate::AvTransportClient::stop`]).
pub fn ensure_success(action: &str, call_result: &SoapCallResult) -> Result<()> {
    if let Some(fault) = call_result.fault() {
        let description = fault.description();
        debug!(
            "{} returned SOAP fault {:?}: {} (HTTP status {})",
            action,
            fault.error_code(),
            description,
            call_result.status
        );
        return Err(KefError::SoapFault {
            action: action.to_string(),
            error_code: fault.error_code(),
            error_description: description,
        });
    }

    if !call_result.status.is_success() {
        warn!("{} failed with HTTP status {}", action, call_result.status);
        return Err(KefError::Http(format!(
            "{} failed with HTTP status {} and body: {}",
            action, call_result.status, call_result.raw_body
        )));
    }

    Ok(())
}

/// Parsed envelope of a successful call; a missing envelope is a parse
/// failure here because the caller needs response fields.
pub fn require_envelope<'a>(action: &str, call_result: &'a SoapCallResult) -> Result<&'a SoapEnvelope> {
    ensure_success(action, call_result)?;
    call_result.envelope.as_ref().ok_or_else(|| {
        KefError::ParsingError(format!("Missing SOAP envelope in {} response", action))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: u16, body: &str) -> SoapCallResult {
        SoapCallResult {
            status: StatusCode::from_u16(status).unwrap(),
            raw_body: body.to_string(),
            envelope: parse_soap_envelope(body.as_bytes()).ok(),
        }
    }

    #[test]
    fn success_without_fault() {
        let call = result(
            200,
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:PauseResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1"/></s:Body></s:Envelope>"#,
        );
        assert!(ensure_success("Pause", &call).is_ok());
        assert!(require_envelope("Pause", &call).is_ok());
    }

    #[test]
    fn fault_with_http_200_is_still_a_failure() {
        let call = result(
            200,
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultstring>UPnPError</faultstring><detail><UPnPError><errorCode>402</errorCode><errorDescription>Invalid Args</errorDescription></UPnPError></detail></s:Fault></s:Body></s:Envelope>"#,
        );
        match ensure_success("Play", &call) {
            Err(KefError::SoapFault {
                error_code,
                error_description,
                ..
            }) => {
                assert_eq!(error_code, Some(402));
                assert_eq!(error_description, "Invalid Args");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn http_error_without_envelope() {
        let call = result(404, "Not Found");
        assert!(matches!(ensure_success("Next", &call), Err(KefError::Http(_))));
    }

    #[test]
    fn malformed_fault_body_is_detected() {
        let call = result(500, "<s:Fault><faultcode>s:Client</faultcode>");
        assert!(call.envelope.is_none());
        assert!(matches!(
            ensure_success("Stop", &call),
            Err(KefError::SoapFault { error_code: None, .. })
        ));
    }

    #[test]
    fn plain_success_body_has_no_envelope() {
        let call = result(200, "OK");
        assert!(ensure_success("Play", &call).is_ok());
        assert!(matches!(
            require_envelope("GetTransportInfo", &call),
            Err(KefError::ParsingError(_))
        ));
    }
}
