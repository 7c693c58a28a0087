//! SOAP response envelope parsing

use std::io::BufReader;

use xmltree::{Element, XMLNode};

/// Parsed SOAP envelope.
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    pub body: SoapBody,
}

/// SOAP body, kept as a raw element tree.
#[derive(Debug, Clone)]
pub struct SoapBody {
    pub content: Element,
}

#[derive(Debug, thiserror::Error)]
pub enum SoapParseError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] xmltree::ParseError),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,
}

/// Parses a complete SOAP envelope.
pub fn parse_soap_envelope(xml: &[u8]) -> Result<SoapEnvelope, SoapParseError> {
    let reader = BufReader::new(xml);
    let root = Element::parse(reader)?;

    if !root.name.ends_with("Envelope") {
        return Err(SoapParseError::MissingEnvelope);
    }

    let body = find_child_with_suffix(&root, "Body").ok_or(SoapParseError::MissingBody)?;

    Ok(SoapEnvelope {
        body: SoapBody {
            content: body.clone(),
        },
    })
}

/// First direct child whose (local) name ends with `suffix`.
pub fn find_child_with_suffix<'a>(parent: &'a Element, suffix: &str) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| match node {
        XMLNode::Element(elem) if elem.name.ends_with(suffix) => Some(elem),
        _ => None,
    })
}

/// Depth-first search for an element whose name ends with `suffix`.
pub fn find_descendant_with_suffix<'a>(parent: &'a Element, suffix: &str) -> Option<&'a Element> {
    for node in &parent.children {
        if let XMLNode::Element(elem) = node {
            if elem.name.ends_with(suffix) {
                return Some(elem);
            }
            if let Some(found) = find_descendant_with_suffix(elem, suffix) {
                return Some(found);
            }
        }
    }
    None
}

/// Trimmed text of the first child named `*suffix`.
///
/// `None` when the element is absent or empty: an absent field is not an
/// error.
pub fn child_text(parent: &Element, suffix: &str) -> Option<String> {
    find_child_with_suffix(parent, suffix)
        .and_then(|child| child.get_text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
