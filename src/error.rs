use thiserror::Error as ThisError;

pub type OpaqueError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(ThisError, Debug)]
pub enum Error {
    /// A capture handle could not be acquired; fatal, no probe is sent.
    #[error("failed to open capture handle: {0}")]
    CapabilityOpen(String),
    /// A probe frame could not be serialized; aborts the affected probe only.
    #[error("failed to encode probe frame: {0}")]
    Encoding(String),
    /// An individual frame write failed; aborts the affected probe only.
    #[error("failed to transmit probe frame: {0}")]
    Transmission(#[from] std::io::Error),
    /// A reply-direction DHCP frame carried options that could not be decoded.
    #[error("malformed DHCP reply: {0}")]
    Decoding(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
