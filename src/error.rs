use std::io;
use thiserror::Error;

/// Failures of the serial link
#[derive(Debug, Error)]
pub enum LinkError {
    /// The port could not be opened or configured
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    /// The port could not be split into reader and writer halves
    #[error("failed to clone serial port {port} for reading: {source}")]
    Clone {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("write to {port} failed: {source}")]
    Write {
        port: String,
        #[source]
        source: io::Error,
    },
    #[error("read from {port} failed: {source}")]
    Read {
        port: String,
        #[source]
        source: io::Error,
    },
}
