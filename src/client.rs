//! Client-side credential attachment.
//!
//! [`BasicAuthInterceptor`] implements [`tonic::service::Interceptor`], so it
//! runs on every outgoing request, unary and streaming alike, when attached
//! with `with_interceptor` or an interceptor layer. There is no client-side
//! skip set; when authentication is disabled the interceptor is a no-op.

use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::warn;

use crate::config::{BasicAuthConfig, BasicAuthOption, AUTHORIZATION_KEY};

#[derive(Clone)]
enum Credential {
    /// Empty username and password: attach nothing.
    Disabled,
    /// Precomputed `<scheme> <encoded>` value, cloned into each request.
    Attach(AsciiMetadataValue),
    /// The configured scheme cannot be carried as ASCII metadata. Calls fail
    /// with an internal status instead of silently going out without a
    /// credential.
    Invalid,
}

/// Attaches `authorization: <scheme> <encoded-credential>` to every outgoing
/// request.
#[derive(Clone)]
pub struct BasicAuthInterceptor {
    credential: Credential,
}

impl BasicAuthInterceptor {
    /// Builds the configuration from the credential pair and `options` and
    /// precomputes the metadata value once.
    pub fn new<U, P, I>(username: U, password: P, options: I) -> Self
    where
        U: Into<String>,
        P: Into<String>,
        I: IntoIterator<Item = BasicAuthOption>,
    {
        Self::from_config(&BasicAuthConfig::build(username, password, options))
    }

    /// Derives the interceptor from an already-built configuration.
    pub fn from_config(config: &BasicAuthConfig) -> Self {
        let credential = if config.is_disabled() {
            Credential::Disabled
        } else {
            match AsciiMetadataValue::try_from(config.authorization_value()) {
                Ok(value) => Credential::Attach(value),
                Err(_) => {
                    warn!(
                        scheme = config.scheme(),
                        "authorization scheme is not representable as metadata"
                    );
                    Credential::Invalid
                }
            }
        };
        Self { credential }
    }
}

impl Interceptor for BasicAuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        match &self.credential {
            Credential::Disabled => Ok(request),
            Credential::Attach(value) => {
                request.metadata_mut().insert(AUTHORIZATION_KEY, value.clone());
                Ok(request)
            }
            Credential::Invalid => Err(Status::internal(
                "authorization credential is not a valid metadata value",
            )),
        }
    }
}
