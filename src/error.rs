use thiserror::Error;

use crate::alert::{Alert, AlertDescription, AlertLevel};

/// Errors raised by the protocol core.
///
/// Peer-caused failures are carried as [`Error::Alert`]. Everything else is a
/// local failure that is reported to the peer as a fatal `internal_error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Alert(Alert),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid key length, expected {expected} got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Parse incomplete")]
    ParseIncomplete,

    #[error("Parse error: {0:?}")]
    ParseError(nom::error::ErrorKind),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a fatal alert raised because of peer input.
    pub fn fatal(description: AlertDescription) -> Self {
        Error::Alert(Alert::new(AlertLevel::Fatal, description))
    }

    /// Shorthand for a local invariant violation.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// The alert that describes this error on the wire.
    pub fn alert(&self) -> Alert {
        match self {
            Error::Alert(alert) => *alert,
            Error::ParseIncomplete | Error::ParseError(_) => {
                Alert::new(AlertLevel::Fatal, AlertDescription::DecodeError)
            }
            Error::Internal(_)
            | Error::InvalidKeyLength { .. }
            | Error::NotImplemented(_)
            | Error::Transport(_) => {
                Alert::new(AlertLevel::Fatal, AlertDescription::InternalError)
            }
        }
    }

    /// Whether this error was caused by the implementation rather than the peer.
    pub fn is_internal(&self) -> bool {
        self.alert().description == AlertDescription::InternalError
    }
}

impl From<Alert> for Error {
    fn from(alert: Alert) -> Self {
        Error::Alert(alert)
    }
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for Error {
    fn from(value: nom::Err<nom::error::Error<&'a [u8]>>) -> Self {
        match value {
            nom::Err::Incomplete(_) => Error::ParseIncomplete,
            nom::Err::Error(x) => Error::ParseError(x.code),
            nom::Err::Failure(x) => Error::ParseError(x.code),
        }
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Internal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_map_to_internal_error_alert() {
        let alert = Error::internal("missing property").alert();
        assert_eq!(alert.level, AlertLevel::Fatal);
        assert_eq!(alert.description, AlertDescription::InternalError);

        let alert = Error::NotImplemented("srp").alert();
        assert_eq!(alert.description, AlertDescription::InternalError);
    }

    #[test]
    fn protocol_errors_keep_their_alert() {
        let err = Error::fatal(AlertDescription::BadRecordMac);
        assert!(!err.is_internal());
        assert_eq!(err.alert().description, AlertDescription::BadRecordMac);
    }

    #[test]
    fn parse_errors_are_decode_errors() {
        let err = Error::ParseError(nom::error::ErrorKind::Eof);
        assert_eq!(err.alert().description, AlertDescription::DecodeError);
    }
}
