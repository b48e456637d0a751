//! The engine's error type.
//!
//! Nearly every expected HTTP condition is surfaced as a [`Status`] rather
//! than an `EngineError` — see the mapping table in the crate's top-level
//! documentation. `EngineError` exists only for the two rows of that table
//! that aren't themselves HTTP status codes: a controller that panics its
//! way out of a callback (caught at the adapter boundary) and an I/O failure
//! while the emitter is mid-flight.

use std::fmt;
use std::io;

/// Everything that can go wrong outside of the ordinary HTTP status flow.
#[derive(Debug)]
pub enum EngineError {
    /// A controller callback returned an application error rather than a
    /// halt status. Maps to `500 Internal Server Error` at the adapter.
    Controller(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// An I/O error occurred while the emitter was streaming a body. The
    /// response may already be partially written; the emitter aborts rather
    /// than attempting to produce a second response.
    Io(io::Error),
    /// A `Range` header, `Forwarded` header, or similar client-supplied
    /// value could not be parsed according to its grammar. Callers that
    /// reach this (rather than silently ignoring the malformed value, as
    /// the decision graph does for `Range`) are using the parser directly.
    Malformed(&'static str),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Controller(e) => write!(f, "controller error: {}", e),
            EngineError::Io(e) => write!(f, "i/o error: {}", e),
            EngineError::Malformed(what) => write!(f, "malformed {}", what),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Controller(e) => Some(e.as_ref()),
            EngineError::Io(e) => Some(e),
            EngineError::Malformed(_) => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(e: io::Error) -> Self {
        EngineError::Io(e)
    }
}
