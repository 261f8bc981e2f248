//! Supporting utility type.
use std::{borrow::Cow, fmt};

/// Trace when `verbose` feature enabled.
macro_rules! verbose {
    ($($tt:tt)*) => {
        #[cfg(feature = "verbose")]
        tracing::trace!($($tt)*)
    };
}

/// Create and enter `Span` when `verbose` feature enabled.
macro_rules! span {
    ($($tt:tt)*) => {
        #[cfg(feature = "verbose")]
        let s = tracing::trace_span!($($tt)*);
        #[cfg(feature = "verbose")]
        let _s = s.enter();
    };
}

/// Construct [`InvalidArgument`] error.
macro_rules! invalid {
    (%$str:literal) => {
        crate::common::InvalidArgument::new($str)
    };
    ($($tt:tt)*) => {
        crate::common::InvalidArgument::new(format!($($tt)*))
    };
}

pub(crate) use verbose;
pub(crate) use span;
pub(crate) use invalid;

/// An error when an argument is rejected before any io is performed.
///
/// Retrying the same call will always fail, the caller must change the argument.
pub struct InvalidArgument(Cow<'static,str>);

impl InvalidArgument {
    pub fn new(message: impl Into<Cow<'static,str>>) -> InvalidArgument {
        Self(message.into())
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl std::error::Error for InvalidArgument { }

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid argument: {}", self.0)
    }
}

impl fmt::Debug for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
