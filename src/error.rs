//! Authentication failure taxonomy.
//!
//! Every failure surfaces to the caller as [`tonic::Code::Unauthenticated`]
//! with a message that never says which half of the credential pair was
//! wrong. The precise extraction cause stays on the error chain for internal
//! logging.

use thiserror::Error;
use tonic::Status;

/// Why a credential could not be pulled out of the request metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The request carries no `authorization` metadata at all.
    #[error("authorization metadata not present")]
    NotPresent,

    /// An `authorization` value with no scheme/credential separator.
    #[error("malformed authorization value")]
    Malformed,

    /// The credential is carried under a different scheme than the
    /// configured one.
    #[error("authorization scheme is not {expected:?}")]
    SchemeMismatch { expected: String },
}

/// Server-side authentication failure.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No usable credential for the configured scheme.
    #[error("request unauthenticated with {scheme}")]
    Extraction {
        scheme: String,
        #[source]
        source: ExtractionError,
    },

    /// A credential was presented but does not match the configured pair.
    #[error("invalid username or password")]
    InvalidCredential,
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        Status::unauthenticated(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn failures_map_to_unauthenticated() {
        let status = Status::from(AuthError::InvalidCredential);
        assert_eq!(status.code(), tonic::Code::Unauthenticated);
        assert_eq!(status.message(), "invalid username or password");

        let status = Status::from(AuthError::Extraction {
            scheme: "basic".to_string(),
            source: ExtractionError::NotPresent,
        });
        assert_eq!(status.code(), tonic::Code::Unauthenticated);
        assert_eq!(status.message(), "request unauthenticated with basic");
    }

    #[test]
    fn caller_message_does_not_leak_the_cause() {
        let err = AuthError::Extraction {
            scheme: "basic".to_string(),
            source: ExtractionError::SchemeMismatch {
                expected: "basic".to_string(),
            },
        };
        assert_eq!(err.to_string(), "request unauthenticated with basic");
    }

    #[test]
    fn extraction_cause_stays_on_the_chain() {
        let err = AuthError::Extraction {
            scheme: "basic".to_string(),
            source: ExtractionError::NotPresent,
        };
        let source = err.source().expect("extraction failures carry a cause");
        assert_eq!(source.to_string(), "authorization metadata not present");

        assert!(AuthError::InvalidCredential.source().is_none());
    }
}
