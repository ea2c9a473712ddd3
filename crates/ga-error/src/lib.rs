//! Error handling for the ga-runtime workspace.
//!
//! Mirrors the hand-rolled error style used throughout the crate: an
//! `ErrString` wrapper for cheap `'static`/owned messages, an `ErrorCode`
//! for coarse-grained dispatch, and `bail!`/`ensure!` macros so call sites
//! read like the rest of the engine.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

pub type Result<T> = std::result::Result<T, GaError>;

/// Coarse error categories, matching the taxonomy in the distribution and
/// error-handling design (Protocol / Factory / Transport / Timeout /
/// Exhaustion / Programmer).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidConfig,
    InvalidParameter,
    Engine,
    Codec,
    Evaluation,
    Protocol,
    Factory,
    Transport,
    Timeout,
    Exhaustion,
    Io,
    Multiple,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrString(Cow<'static, str>);

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<Cow<'static, str>>> From<T> for ErrString {
    fn from(v: T) -> Self {
        Self(v.into())
    }
}

#[derive(Debug)]
pub enum GaError {
    InvalidConfig { message: ErrString },
    InvalidParameter { message: ErrString },
    Engine { message: ErrString },
    Codec { message: ErrString },
    Evaluation { message: ErrString },
    /// Malformed, oversize, or unexpected-command wire traffic.
    Protocol { message: ErrString },
    /// The problem plug-in rejected its parameters or failed to load.
    Factory { message: ErrString },
    /// Socket error or peer disconnect.
    Transport { message: ErrString },
    /// Read/write idleness exceeded the configured timeout.
    Timeout { message: ErrString },
    /// No connected helper can help on the current factory.
    Exhaustion { message: ErrString },
    Io(std::io::Error),
    Multiple(MultiDisplay),
    Context {
        context: ErrorContext,
        source: Box<GaError>,
    },
}

impl GaError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            Self::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            Self::Engine { .. } => ErrorCode::Engine,
            Self::Codec { .. } => ErrorCode::Codec,
            Self::Evaluation { .. } => ErrorCode::Evaluation,
            Self::Protocol { .. } => ErrorCode::Protocol,
            Self::Factory { .. } => ErrorCode::Factory,
            Self::Transport { .. } => ErrorCode::Transport,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Exhaustion { .. } => ErrorCode::Exhaustion,
            Self::Io(_) => ErrorCode::Io,
            Self::Multiple(_) => ErrorCode::Multiple,
            Self::Context { .. } => ErrorCode::Context,
        }
    }

    pub fn with_context(self, msg: impl Into<String>) -> Self {
        GaError::Context {
            context: ErrorContext::new(msg),
            source: Box::new(self),
        }
    }
}

impl Display for GaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { message } => write!(f, "invalid configuration: {message}"),
            Self::InvalidParameter { message } => write!(f, "invalid parameter: {message}"),
            Self::Engine { message } => write!(f, "engine error: {message}"),
            Self::Codec { message } => write!(f, "codec error: {message}"),
            Self::Evaluation { message } => write!(f, "evaluation error: {message}"),
            Self::Protocol { message } => write!(f, "protocol error: {message}"),
            Self::Factory { message } => write!(f, "factory error: {message}"),
            Self::Transport { message } => write!(f, "transport error: {message}"),
            Self::Timeout { message } => write!(f, "timeout: {message}"),
            Self::Exhaustion { message } => write!(f, "exhausted: {message}"),
            Self::Io(source) => write!(f, "io error: {source}"),
            Self::Multiple(m) => write!(f, "multiple errors:\n{m}"),
            Self::Context { context, source } => write!(f, "{context}\ncaused by: {source}"),
        }
    }
}

impl std::error::Error for GaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(source) => Some(source),
            Self::Context { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GaError {
    fn from(source: std::io::Error) -> Self {
        GaError::Io(source)
    }
}

#[derive(Debug)]
pub struct ErrorContext {
    message: String,
}

impl ErrorContext {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { message: msg.into() }
    }
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ErrorContext {}

#[derive(Debug)]
pub struct MultiDisplay(Vec<GaError>);

impl Display for MultiDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{i}] {e} (code: {:?})", e.code())?;
        }
        Ok(())
    }
}

impl From<Vec<GaError>> for MultiDisplay {
    fn from(v: Vec<GaError>) -> Self {
        Self(v)
    }
}

/// Ergonomic `.context("...")` for any `Result<T, E: Into<GaError>>`.
pub trait ResultExt<T> {
    fn context(self, msg: impl Into<String>) -> Result<T>;
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<GaError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[doc(hidden)]
pub mod __private {
    #[inline]
    #[cold]
    #[must_use]
    pub fn must_use<E>(e: E) -> E {
        e
    }
}

#[macro_export]
macro_rules! ga_err {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::GaError::$variant { message: format!($fmt, $($arg),*).into() })
    };
    ($variant:ident: $msg:expr $(,)?) => {
        $crate::__private::must_use($crate::GaError::$variant { message: $msg.into() })
    };
}

#[macro_export]
macro_rules! ga_bail {
    ($($tt:tt)+) => {
        return Err($crate::ga_err!($($tt)+))
    };
}

#[macro_export]
macro_rules! ga_ensure {
    ($cond:expr, $($tt:tt)+) => {
        if !$cond {
            $crate::ga_bail!($($tt)+);
        }
    };
}
