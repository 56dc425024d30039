use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type. Variants mirror the error kinds a caller must be
/// able to distinguish: which ones are recoverable locally (skip and
/// continue), which trigger reconnection, and which are fatal at startup.
#[derive(Error, Debug)]
pub enum Error {
    /// Serial read/write failure or a vanished port. Recovered by the
    /// connection supervisor reconnecting.
    #[error("transport fault: {0}")]
    Transport(#[from] std::io::Error),

    /// Serial port error raised directly by the `serialport` crate (as
    /// opposed to a generic `io::Error`).
    #[error("serial port fault: {0}")]
    SerialPort(#[from] serialport::Error),

    /// Oversized discard prefix or repeated checksum failures while framing.
    #[error("framing anomaly: {0}")]
    Framing(String),

    /// Unknown packet type or under-length payload while decoding.
    #[error("decode error: {0}")]
    Decode(String),

    /// No response arrived to a register read within its timeout.
    #[error("configuration read timed out after {0:?}")]
    ConfigTimeout(std::time::Duration),

    /// A register write did not succeed after exhausting retries.
    #[error("configuration write failed for register 0x{register:02X} after {attempts} attempts")]
    ConfigWrite { register: u8, attempts: u32 },

    /// CSV write or rotation failed.
    #[error("storage I/O error: {0}")]
    Storage(#[from] csv::Error),

    /// An RLS update saw a zero gain denominator or a non-finite sample.
    #[error("numerical anomaly: {0}")]
    Numerical(String),

    /// A composite configuration operation (factory reset, etc.) aborted
    /// partway through.
    #[error("configuration sequence aborted at step '{step}': {reason}")]
    ConfigSequence { step: &'static str, reason: String },

    /// No serial candidate could be opened and verified.
    #[error("no working serial port found among {0} candidate(s)")]
    NoPortAvailable(usize),
}
