//! Error type shared by discovery and the port lifecycle.
//!
//! Every failure the core can produce is an ordinary value of [`Error`]; nothing
//! in this crate panics across the public API. The variants map onto the
//! failure classes a caller has to tell apart:
//!
//! - **configuration** (`EmptyPortName`, `Open`, `Configure`): `initialize` could not
//!   bring the port up. The handle has already been released.
//! - **hard I/O** (`Io`, `NotOpen`): the underlying read/write call failed. Not retried.
//! - **caller contract** (`EmptyBuffer`): a zero-length read buffer.
//! - **reconnect** (`ReconnectExhausted`, `Cancelled`): the reconnect loop was bounded
//!   by policy or stopped through a [`crate::CancelToken`].
//! - **discovery** (`MalformedAttribute`): a hardware id attribute exists but is not
//!   hexadecimal.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Port name is empty")]
    EmptyPortName,

    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Serial port is not open")]
    NotOpen,

    #[error("Read buffer is empty")]
    EmptyBuffer,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed hexadecimal attribute {path}: {content:?}")]
    MalformedAttribute { path: PathBuf, content: String },

    #[error("Device did not come back after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("Reconnect cancelled")]
    Cancelled,
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(inner) => inner,
            Error::Open { source, .. } | Error::Configure { source, .. } => source,
            Error::NotOpen => io::Error::new(io::ErrorKind::NotConnected, err),
            Error::EmptyBuffer | Error::EmptyPortName => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            Error::Cancelled => io::Error::new(io::ErrorKind::Interrupted, err),
            other => io::Error::other(other),
        }
    }
}
