use thiserror::Error;

#[derive(Error, Debug)]
pub enum KefError {
    /// TCP connect/read/write failure on the binary control port.
    #[error("Communication Error: {0}")]
    Communication(String),
    /// The SOAP request got no usable HTTP response.
    #[error("Http Error: {0}")]
    Http(String),
    /// The device answered with a SOAP Fault element.
    #[error("{action} returned UPnP error {}: {error_description}", fault_code_label(.error_code))]
    SoapFault {
        action: String,
        error_code: Option<u32>,
        error_description: String,
    },
    #[error("{0}")]
    ParsingError(String),
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("Stream serving Error: {0}")]
    StreamServe(String),
    #[error("Config Error: {0}")]
    Config(String),
}

impl KefError {
    pub fn unsupported_format(description: &str) -> Self {
        KefError::UnsupportedFormat(description.to_string())
    }

    /// True when the failure comes from the transport layer (TCP or HTTP),
    /// i.e. the device is probably unreachable.
    pub fn is_communication(&self) -> bool {
        matches!(self, KefError::Communication(_) | KefError::Http(_))
    }
}

fn fault_code_label(code: &Option<u32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "(no code)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, KefError>;
