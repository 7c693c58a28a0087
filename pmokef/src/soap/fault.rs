//! SOAP faults returned by UPnP devices

use super::envelope::{SoapEnvelope, child_text, find_child_with_suffix, find_descendant_with_suffix};

/// SOAP Fault element of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    /// `faultcode`, e.g. "s:Client"
    pub fault_code: Option<String>,

    /// `faultstring`, usually "UPnPError"
    pub fault_string: Option<String>,

    /// UPnP detail, when the device provides one
    pub upnp_error: Option<UpnpError>,
}

/// UPnP error carried in `detail/UPnPError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpnpError {
    pub error_code: Option<u32>,
    pub error_description: Option<String>,
}

impl SoapFault {
    /// Extracts the fault from a response body, `None` if there is none.
    pub fn from_envelope(envelope: &SoapEnvelope) -> Option<Self> {
        let fault = find_descendant_with_suffix(&envelope.body.content, "Fault")?;

        let upnp_error = find_descendant_with_suffix(fault, "UPnPError").map(|detail| UpnpError {
            error_code: child_text(detail, "errorCode").and_then(|code| code.parse::<u32>().ok()),
            error_description: child_text(detail, "errorDescription"),
        });

        Some(Self {
            fault_code: find_child_with_suffix(fault, "faultcode")
                .and_then(|e| e.get_text())
                .map(|t| t.trim().to_string()),
            fault_string: find_child_with_suffix(fault, "faultstring")
                .and_then(|e| e.get_text())
                .map(|t| t.trim().to_string()),
            upnp_error,
        })
    }

    pub fn error_code(&self) -> Option<u32> {
        self.upnp_error.as_ref().and_then(|e| e.error_code)
    }

    /// Best available human-readable description.
    pub fn description(&self) -> String {
        self.upnp_error
            .as_ref()
            .and_then(|e| e.error_description.clone())
            .or_else(|| self.fault_string.clone())
            .unwrap_or_else(|| "Unknown SOAP fault".to_string())
    }
}

/// Looks for a `<Fault>` or `<prefix:Fault>` start tag in raw text.
///
/// Used when the body is not a well-formed envelope.
pub fn contains_fault_tag(raw: &str) -> bool {
    raw.match_indices("Fault").any(|(idx, _)| {
        let before = raw[..idx].chars().next_back();
        let after = raw[idx + "Fault".len()..].chars().next();
        let opens = match before {
            Some('<') => true,
            Some(':') => raw[..idx]
                .rfind(|c: char| c == '<' || c.is_whitespace() || c == '>')
                .map(|pos| raw[pos..].starts_with('<') && !raw[pos..].starts_with("</"))
                .unwrap_or(false),
            _ => false,
        };
        let closes = matches!(after, Some('>') | Some('/') | Some(' ') | Some('\t') | Some('\r') | Some('\n'));
        opens && closes
    })
}
