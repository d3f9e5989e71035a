//! Error handling foundation for the Krishi Officer backend.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain-specific error enum in its own error
//! module; trait seams return `Result<T, ThatError>` so callers receive a
//! [`Report`] they can log or render at the HTTP boundary.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Unavailable;

    impl std::fmt::Display for Unavailable {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "unavailable")
        }
    }

    impl std::error::Error for Unavailable {}

    fn lookup(available: bool) -> Result<u32, Unavailable> {
        if available {
            Ok(7)
        } else {
            Err(Unavailable.into())
        }
    }

    #[test]
    fn typed_result_carries_context() {
        assert_eq!(lookup(true).expect("should be ok"), 7);

        let err = lookup(false).unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }
}
