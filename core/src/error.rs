use std::fmt;

use crate::val::ValueType;

/// Errors surfaced by the composition layer.
///
/// Only `Runtime` errors come out of the machine itself. The other two are
/// raised locally, before or after a primitive runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The engine was used incorrectly (blocked anchors, bad positions, ...).
    Composition(String),
    /// A machine primitive failed; the message is the machine's own.
    Runtime(String),
    /// A strict conversion to a native type was impossible.
    Conversion { target: &'static str, found: ValueType },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn composition(message: impl Into<String>) -> Self {
        Error::Composition(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime(message.into())
    }

    pub fn conversion(target: &'static str, found: ValueType) -> Self {
        Error::Conversion { target, found }
    }

    pub fn is_composition(&self) -> bool {
        matches!(self, Error::Composition(_))
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, Error::Runtime(_))
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, Error::Conversion { .. })
    }

    /// Message carried across a native call boundary.
    ///
    /// Runtime errors pass through untouched; anything else is reported as a
    /// failure of the native function that raised it.
    pub(crate) fn into_foreign(self) -> Self {
        match self {
            Error::Runtime(_) => self,
            other => Error::Runtime(format!("native function terminated with an error: {other}")),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Composition(msg) => write!(f, "{msg}"),
            Error::Runtime(msg) => write!(f, "{msg}"),
            Error::Conversion { target, found } => write!(f, "bad cast to {target} ({found} value)"),
        }
    }
}

impl std::error::Error for Error {}
