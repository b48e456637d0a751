//! The result carrier returned by every [`Resource`](crate::resource::Resource)
//! callback.
//!
//! A callback either answers normally, short-circuits the decision graph
//! with a status code, or fails outright. Making the three arms an explicit
//! enum lets the compiler force every call site to handle all three, rather
//! than leaving "did this halt or error" as something checked informally
//! after the fact.

use crate::error::EngineError;
use http::StatusCode;

/// The result of invoking a single controller callback.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The callback answered normally with `T`.
    Success(T),
    /// The callback halted the decision graph with this status. The
    /// remaining decision nodes are skipped, but `finish_request` and the
    /// emitter still run.
    Halt(StatusCode),
    /// The callback raised an application error; maps to `500`.
    Error(EngineError),
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Outcome::Success(value)
    }

    pub fn halt(status: StatusCode) -> Self {
        Outcome::Halt(status)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Collapses `Halt`/`Error` into `default`, keeping only a successful
    /// value. Used at call sites that only care about the happy path and
    /// let a later node observe the halt via the context's status field.
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Outcome::Success(v) => v,
            _ => default,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(v) => Outcome::Success(f(v)),
            Outcome::Halt(s) => Outcome::Halt(s),
            Outcome::Error(e) => Outcome::Error(e),
        }
    }
}
