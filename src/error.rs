//! Error types
//!
//! `DecodeError` covers everything that can end an ingest session. `Error`
//! is the crate-level error returned by the server and client entry points.

use std::io;

/// Error produced while reading messages from the upstream socket
#[derive(Debug)]
pub enum DecodeError {
    /// Peer closed the connection (a read returned 0 bytes)
    ConnectionClosed,
    /// Underlying I/O failure other than a clean close
    Io(io::Error),
    /// No marker found within the resync bound
    ResyncFailed {
        /// Bytes discarded before giving up
        scanned: usize,
    },
    /// Declared length exceeds the payload limit
    PayloadTooLarge { size: u32, max: usize },
    /// Dimensions message with a length other than 8
    InvalidDimensions { size: u32 },
    /// Unknown message type tag
    UnknownType(u8),
}

impl DecodeError {
    /// Whether this error is a transport closure rather than a protocol fault
    pub fn is_closed(&self) -> bool {
        match self {
            DecodeError::ConnectionClosed => true,
            DecodeError::Io(e) => is_disconnect(e),
            _ => false,
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::ConnectionClosed => write!(f, "Connection closed by peer"),
            DecodeError::Io(e) => write!(f, "I/O error: {}", e),
            DecodeError::ResyncFailed { scanned } => {
                write!(f, "Resync failed after scanning {} bytes", scanned)
            }
            DecodeError::PayloadTooLarge { size, max } => {
                write!(f, "Declared size {} exceeds maximum {}", size, max)
            }
            DecodeError::InvalidDimensions { size } => {
                write!(f, "Invalid dimensions size: {} (expected 8)", size)
            }
            DecodeError::UnknownType(t) => write!(f, "Unknown message type: {}", t),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::ConnectionClosed
        } else {
            DecodeError::Io(e)
        }
    }
}

/// Error produced by a frame encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Raw buffer size does not match the declared geometry
    SizeMismatch { expected: usize, actual: usize },
    /// Width or height is zero or negative
    InvalidGeometry { width: i32, height: i32 },
    /// The image codec rejected the frame
    Codec(String),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::SizeMismatch { expected, actual } => {
                write!(f, "Frame size mismatch: expected {} bytes, got {}", expected, actual)
            }
            EncodeError::InvalidGeometry { width, height } => {
                write!(f, "Invalid frame geometry: {}x{}", width, height)
            }
            EncodeError::Codec(msg) => write!(f, "Encoder error: {}", msg),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Crate-level error
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Decode(DecodeError),
    Encode(EncodeError),
    /// Message could not be written (e.g. payload over the wire limit)
    InvalidMessage(String),
    /// Client used before `connect`
    NotConnected,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Decode(e) => write!(f, "Decode error: {}", e),
            Error::Encode(e) => write!(f, "{}", e),
            Error::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            Error::NotConnected => write!(f, "Not connected"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Decode(e) => Some(e),
            Error::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Error::Encode(e)
    }
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Whether an I/O error means the peer went away
pub fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_maps_to_closed() {
        let err: DecodeError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err, DecodeError::ConnectionClosed));
        assert!(err.is_closed());
    }

    #[test]
    fn test_reset_is_closed() {
        let err: DecodeError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert!(matches!(err, DecodeError::Io(_)));
        assert!(err.is_closed());
    }

    #[test]
    fn test_protocol_errors_are_not_closed() {
        assert!(!DecodeError::UnknownType(9).is_closed());
        assert!(!DecodeError::InvalidDimensions { size: 4 }.is_closed());
        assert!(!DecodeError::ResyncFailed { scanned: 10 }.is_closed());
    }

    #[test]
    fn test_display() {
        let err = DecodeError::PayloadTooLarge {
            size: 20,
            max: 10,
        };
        assert_eq!(err.to_string(), "Declared size 20 exceeds maximum 10");
    }
}
