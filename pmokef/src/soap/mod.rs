//! # SOAP helpers for UPnP control
//!
//! Client-side half of the SOAP protocol: building request envelopes,
//! parsing response envelopes and recognising SOAP faults.
//!
//! - [`build_soap_request`] : request envelope for one action
//! - [`parse_soap_envelope`] : response envelope, parsed with `xmltree`
//! - [`SoapFault`] : fault element, with the optional UPnP error detail
//!
//! ## Example
//!
//! ```
//! use pmokef::soap::{build_soap_request, parse_soap_envelope, SoapFault};
//!
//! let request = build_soap_request(
//!     "urn:schemas-upnp-org:service:AVTransport:1",
//!     "Stop",
//!     &[("InstanceID", "0")],
//! ).unwrap();
//! assert!(request.contains("<InstanceID>0</InstanceID>"));
//!
//! let body = r#"<?xml version="1.0"?>
//! <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
//!   <s:Body>
//!     <s:Fault>
//!       <faultcode>s:Client</faultcode>
//!       <faultstring>UPnPError</faultstring>
//!       <detail>
//!         <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
//!           <errorCode>701</errorCode>
//!           <errorDescription>Transition not available</errorDescription>
//!         </UPnPError>
//!       </detail>
//!     </s:Fault>
//!   </s:Body>
//! </s:Envelope>"#;
//!
//! let envelope = parse_soap_envelope(body.as_bytes()).unwrap();
//! let fault = SoapFault::from_envelope(&envelope).unwrap();
//! assert_eq!(fault.error_code(), Some(701));
//! ```

mod builder;
mod envelope;
mod fault;

pub use builder::build_soap_request;
pub use envelope::{
    SoapBody, SoapEnvelope, SoapParseError, child_text, find_child_with_suffix,
    find_descendant_with_suffix, parse_soap_envelope,
};
pub use fault::{SoapFault, UpnpError, contains_fault_tag};

/// UPnP AVTransport error codes the client reacts to.
pub mod error_codes {
    /// AVTransport: transition not available (e.g. Stop while already stopped).
    pub const TRANSITION_NOT_AVAILABLE: u32 = 701;
}
