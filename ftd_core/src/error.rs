use std::convert::From;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result;

use serde_json::Value;

/// A specialized type for `ftd` operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for `ftd` executions.
pub struct Error {
    repr: Repr,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.repr, f)
    }
}

enum Repr {
    Simple(ErrorKind),
    Custom(Box<Custom>),
}

#[derive(Debug)]
struct Custom {
    kind: ErrorKind,
    error: Box<dyn StdError + Send + Sync>,
}

/// A list specifying general categories of `ftd` error.
///
/// This list is intended to grow over time and it is not recommended to
/// exhaustively match against it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An entity was not found, often an object looked up by name.
    NotFound,
    /// Data is invalid, often wrong task params or unknown operations.
    InvalidData,
    /// I/O error propagation
    IOError,
    /// The device answered with a non-2xx status code.
    ServerError,
    /// The request never got an answer from the device.
    ConnectionError,
    /// A polling loop ran out of time.
    Timeout,
    /// Any `ftd` error not part of this list.
    Other,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "entity not found",
            ErrorKind::InvalidData => "invalid data",
            ErrorKind::IOError => "I/O error",
            ErrorKind::ServerError => "server error",
            ErrorKind::ConnectionError => "connection error",
            ErrorKind::Timeout => "timed out",
            ErrorKind::Other => "other error",
        }
    }
}

/// Non-2xx answer from the FDM API.
///
/// `response` holds the parsed JSON body when the device sent JSON, otherwise the raw
/// body as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct FtdServerError {
    pub code: u16,
    pub response: Value,
}

impl FtdServerError {
    pub fn new(code: u16, body: &[u8]) -> Self {
        let response = serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()));
        FtdServerError { code, response }
    }

    /// Body as text, used for substring checks on validation messages.
    pub fn response_text(&self) -> String {
        match &self.response {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FtdServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server returned {}: {}", self.code, self.response_text())
    }
}

impl StdError for FtdServerError {}

/// Intended to use with errors that aren't exposed to the user, where allocating onto
/// the heap (for normal construction via Error::new) is too costly.
impl From<ErrorKind> for Error {
    /// Converts an [`ErrorKind`] into an [`Error`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ftd_core::error::{Error, ErrorKind};
    ///
    /// let not_found = ErrorKind::NotFound;
    /// let error = Error::from(not_found);
    /// assert_eq!("entity not found", format!("{}", error));
    /// ```
    #[inline]
    fn from(kind: ErrorKind) -> Error {
        Error {
            repr: Repr::Simple(kind),
        }
    }
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`] of kind `IOError`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ftd_core::error::Error;
    /// use std::io;
    ///
    /// let io_error = io::Error::new(io::ErrorKind::NotFound, "fail");
    /// let error = Error::from(io_error);
    /// assert_eq!("fail", format!("{}", error));
    /// ```
    #[inline]
    fn from(e: io::Error) -> Error {
        Error::new(ErrorKind::IOError, e)
    }
}

impl From<serde_norway::Error> for Error {
    #[inline]
    fn from(error: serde_norway::Error) -> Error {
        Error::new(ErrorKind::InvalidData, error)
    }
}

impl From<serde_json::Error> for Error {
    #[inline]
    fn from(error: serde_json::Error) -> Error {
        Error::new(ErrorKind::InvalidData, error)
    }
}

impl From<reqwest::Error> for Error {
    #[inline]
    fn from(error: reqwest::Error) -> Error {
        let kind = if error.is_timeout() {
            ErrorKind::Timeout
        } else {
            ErrorKind::ConnectionError
        };
        Error::new(kind, error)
    }
}

impl From<FtdServerError> for Error {
    #[inline]
    fn from(error: FtdServerError) -> Error {
        Error::new(ErrorKind::ServerError, error)
    }
}

impl Error {
    /// Creates a new `ftd` error from a known kind of error as well as an
    /// arbitrary error payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use ftd_core::error::{Error, ErrorKind};
    ///
    /// let invalid_data_err = Error::new(
    ///     ErrorKind::InvalidData,
    ///     "no valid data",
    /// );
    /// let custom_error = Error::new(
    ///     ErrorKind::Other,
    ///     invalid_data_err,
    /// );
    /// assert_eq!(custom_error.kind(), ErrorKind::Other);
    /// ```
    pub fn new<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::_new(kind, error.into())
    }

    fn _new(kind: ErrorKind, error: Box<dyn StdError + Send + Sync>) -> Error {
        Error {
            repr: Repr::Custom(Box::new(Custom { kind, error })),
        }
    }

    /// Builds a `ServerError` from a status code and a raw response body.
    pub fn server(code: u16, body: &[u8]) -> Error {
        Error::from(FtdServerError::new(code, body))
    }

    /// Returns the corresponding `ErrorKind` for this error.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            Repr::Custom(ref c) => c.kind,
            Repr::Simple(kind) => kind,
        }
    }

    /// Returns the [`FtdServerError`] payload when the device answered with a failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use ftd_core::error::Error;
    ///
    /// let error = Error::server(422, br#"{"error": "duplicate"}"#);
    /// assert_eq!(error.server_error().unwrap().code, 422);
    /// ```
    pub fn server_error(&self) -> Option<&FtdServerError> {
        match self.repr {
            Repr::Custom(ref c) if c.kind == ErrorKind::ServerError => {
                c.error.downcast_ref::<FtdServerError>()
            }
            _ => None,
        }
    }

    /// Status code of the server answer, if this is a server error.
    pub fn status_code(&self) -> Option<u16> {
        self.server_error().map(|e| e.code)
    }

    /// Consumes the `Error`, returning its inner error (if any).
    pub fn into_inner(self) -> Option<Box<dyn StdError + Send + Sync>> {
        match self.repr {
            Repr::Simple(..) => None,
            Repr::Custom(c) => Some(c.error),
        }
    }
}

impl fmt::Debug for Repr {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Repr::Custom(ref c) => fmt::Debug::fmt(&c, fmt),
            Repr::Simple(kind) => fmt.debug_tuple("Kind").field(&kind).finish(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            Repr::Custom(ref c) => c.error.fmt(fmt),
            Repr::Simple(kind) => write!(fmt, "{}", kind.as_str()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self.repr {
            Repr::Simple(..) => None,
            Repr::Custom(ref c) => c.error.source(),
        }
    }
}
