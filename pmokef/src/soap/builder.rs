//! Construction of SOAP request envelopes

use xmltree::{Element, XMLNode};

fn build_soap_envelope_with_body(body_child: Element) -> Result<String, xmltree::Error> {
    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(body_child));

    let mut envelope = Element::new("s:Envelope");
    envelope.attributes.insert(
        "xmlns:s".to_string(),
        "http://schemas.xmlsoap.org/soap/envelope/".to_string(),
    );
    envelope.attributes.insert(
        "s:encodingStyle".to_string(),
        "http://schemas.xmlsoap.org/soap/encoding/".to_string(),
    );
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = xmltree::EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(true)
        .indent_string("  ");
    envelope.write_with_config(&mut buf, config)?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Builds the request envelope for `action` of `service_urn`.
///
/// Argument values are written as text nodes, so URLs containing `&` are
/// escaped.
pub fn build_soap_request(
    service_urn: &str,
    action: &str,
    args: &[(&str, &str)],
) -> Result<String, xmltree::Error> {
    let request_name = format!("u:{}", action);
    let mut request_elem = Element::new(&request_name);
    request_elem
        .attributes
        .insert("xmlns:u".to_string(), service_urn.to_string());

    for (name, value) in args {
        let mut child = Element::new(*name);
        if !value.is_empty() {
            child.children.push(XMLNode::Text((*value).to_string()));
        }
        request_elem.children.push(XMLNode::Element(child));
    }

    build_soap_envelope_with_body(request_elem)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AVT: &str = "urn:schemas-upnp-org:service:AVTransport:1";

    #[test]
    fn test_build_request() {
        let xml = build_soap_request(AVT, "Play", &[("InstanceID", "0"), ("Speed", "1")]).unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<u:Play"));
        assert!(xml.contains("xmlns:u=\"urn:schemas-upnp-org:service:AVTransport:1\""));
        assert!(xml.contains("<InstanceID>0</InstanceID>"));
        assert!(xml.contains("<Speed>1</Speed>"));
        assert!(xml.contains("xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\""));
    }

    #[test]
    fn test_uri_is_escaped() {
        let xml = build_soap_request(
            AVT,
            "SetAVTransportURI",
            &[
                ("InstanceID", "0"),
                ("CurrentURI", "http://10.0.0.2:8080/audio/1?a=1&b=2.mp3"),
                ("CurrentURIMetaData", ""),
            ],
        )
        .unwrap();

        assert!(xml.contains("a=1&amp;b=2.mp3"));
        assert!(xml.contains("CurrentURIMetaData"));
    }
}
