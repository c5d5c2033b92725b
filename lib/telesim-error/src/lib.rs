//! Application-level error handling.
//!
//! Libraries in this workspace declare their own typed errors where callers need to match on them. Everything that
//! only needs to be reported, such as configuration and bootstrap failures in the simulator binary, flows through
//! [`GenericError`] instead.
#![deny(warnings)]
#![deny(missing_docs)]

use std::fmt::Display;

/// A type-erased error with an attached chain of context messages.
pub type GenericError = anyhow::Error;

/// Constructs a [`GenericError`].
///
/// Accepts a string literal, a format string with arguments (as with `std::format!`), or any value implementing
/// `Debug` and `Display`. When given an existing `std::error::Error`, its source chain is preserved.
#[macro_export]
macro_rules! generic_error {
    ($msg:literal $(,)?) => { $crate::_anyhow!($msg) };
    ($err:expr $(,)?) => { $crate::_anyhow!($err) };
    ($fmt:expr, $($arg:tt)*) => { $crate::_anyhow!($fmt, $($arg)*) };
}

#[doc(hidden)]
pub use anyhow::anyhow as _anyhow;

mod private {
    pub trait Sealed {}

    impl<T, E> Sealed for Result<T, E> {}
}

/// Extension methods for attaching context to fallible results.
///
/// This wraps `anyhow::Context` under different method names so it never collides with `snafu::ResultExt` when both
/// are imported in the same module.
pub trait ErrorContext<T, E>: private::Sealed {
    /// Wraps the error value with additional context.
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static;

    /// Wraps the error value with additional context, which is only built if an error actually occurred.
    fn with_error_context<C, F>(self, f: F) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T, E> for Result<T, E>
where
    Result<T, E>: anyhow::Context<T, E>,
{
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
    {
        <Self as anyhow::Context<T, E>>::context(self, context)
    }

    fn with_error_context<C, F>(self, f: F) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        <Self as anyhow::Context<T, E>>::with_context(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_prepended_to_chain() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("port in use"));
        let error = result.error_context("Failed to bind metrics server.").unwrap_err();

        let chain = error.chain().map(|e| e.to_string()).collect::<Vec<_>>();
        assert_eq!(chain, vec!["Failed to bind metrics server.", "port in use"]);
    }

    #[test]
    fn lazy_context_only_built_on_error() {
        let result: Result<u16, std::num::ParseIntError> = "8000".parse::<u16>();
        let value = result
            .with_error_context(|| -> String { panic!("context should not be evaluated") })
            .unwrap();
        assert_eq!(value, 8000);
    }

    #[test]
    fn macro_formats_arguments() {
        let error = generic_error!("Missing environment variables: {}", "INSTANCE_ID");
        assert_eq!(error.to_string(), "Missing environment variables: INSTANCE_ID");
    }
}
