//! Credential configuration shared by the client and server adapters.
//!
//! A [`BasicAuthConfig`] is built once from the credential pair plus an
//! ordered list of options, then frozen. After that it is only ever read, so
//! a single config can serve any number of concurrent calls without
//! synchronization.

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::HeaderMap;
use subtle::ConstantTimeEq as _;

use crate::error::{AuthError, ExtractionError};

/// Metadata key carrying the credential.
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Scheme label used when no [`with_scheme`] option is given.
pub const DEFAULT_SCHEME: &str = "basic";

/// A named configuration mutation, applied in order by
/// [`BasicAuthConfig::build`].
pub struct BasicAuthOption(OptionKind);

enum OptionKind {
    SkipMethods(Vec<String>),
    Scheme(String),
}

/// Exempts the given fully-qualified method names
/// (`/package.Service/Method`) from authentication.
///
/// Methods are matched verbatim against the request path; no case folding or
/// slash trimming. Adding the same method twice has the same effect as
/// adding it once.
pub fn with_skipped_methods<I, M>(methods: I) -> BasicAuthOption
where
    I: IntoIterator<Item = M>,
    M: Into<String>,
{
    BasicAuthOption(OptionKind::SkipMethods(
        methods.into_iter().map(Into::into).collect(),
    ))
}

/// Replaces the `basic` scheme label prefixed to the encoded credential.
pub fn with_scheme(scheme: impl Into<String>) -> BasicAuthOption {
    BasicAuthOption(OptionKind::Scheme(scheme.into()))
}

/// Immutable credential configuration.
///
/// Holds the shared username/password pair, the scheme label, the set of
/// methods exempt from authentication, and the memoized transport encoding
/// of the credential.
#[derive(Clone)]
pub struct BasicAuthConfig {
    username: String,
    password: String,
    scheme: String,
    skipped_methods: HashSet<String>,
    encoded_credential: String,
}

impl BasicAuthConfig {
    /// Applies `options` in order to a draft config, then freezes it.
    ///
    /// The base64 rendering of `username:password` is computed here, once,
    /// and reused for every subsequent comparison and attachment.
    pub fn build<U, P, I>(username: U, password: P, options: I) -> Self
    where
        U: Into<String>,
        P: Into<String>,
        I: IntoIterator<Item = BasicAuthOption>,
    {
        let mut config = Self {
            username: username.into(),
            password: password.into(),
            scheme: DEFAULT_SCHEME.to_string(),
            skipped_methods: HashSet::new(),
            encoded_credential: String::new(),
        };
        for option in options {
            match option.0 {
                OptionKind::SkipMethods(methods) => config.skipped_methods.extend(methods),
                OptionKind::Scheme(scheme) => config.scheme = scheme,
            }
        }
        config.encoded_credential =
            STANDARD.encode(format!("{}:{}", config.username, config.password));
        config
    }

    /// Authentication is disabled when both username and password are empty:
    /// every call passes verification and the client attaches nothing.
    pub fn is_disabled(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }

    /// Whether a call to `full_method` must present a credential.
    ///
    /// Only skip-set members are exempt; unknown methods authenticate.
    pub fn should_authenticate(&self, full_method: &str) -> bool {
        !self.skipped_methods.contains(full_method)
    }

    /// Scheme label prefixed to the encoded credential on the wire.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Memoized base64 rendering of `username:password`.
    pub fn encoded_credential(&self) -> &[u8] {
        self.encoded_credential.as_bytes()
    }

    /// Full `authorization` value the client side attaches.
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.scheme, self.encoded_credential)
    }

    /// Server-side verification against the incoming request headers.
    ///
    /// Extracts the credential carried under the configured scheme and
    /// compares it against the expected encoding in constant time.
    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        if self.is_disabled() {
            return Ok(());
        }
        let presented =
            self.credential_from_headers(headers)
                .map_err(|source| AuthError::Extraction {
                    scheme: self.scheme.clone(),
                    source,
                })?;
        if constant_time_eq(presented, self.encoded_credential.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredential)
        }
    }

    /// Pulls the credential bytes for our scheme out of the `authorization`
    /// header. The scheme token matches case-insensitively; the bytes after
    /// the separating space are returned untouched.
    fn credential_from_headers<'h>(
        &self,
        headers: &'h HeaderMap,
    ) -> Result<&'h [u8], ExtractionError> {
        let value = headers
            .get(AUTHORIZATION_KEY)
            .ok_or(ExtractionError::NotPresent)?;
        let bytes = value.as_bytes();
        let separator = bytes
            .iter()
            .position(|&b| b == b' ')
            .ok_or(ExtractionError::Malformed)?;
        let (scheme, credential) = bytes.split_at(separator);
        if !scheme.eq_ignore_ascii_case(self.scheme.as_bytes()) {
            return Err(ExtractionError::SchemeMismatch {
                expected: self.scheme.clone(),
            });
        }
        Ok(&credential[1..])
    }
}

/// Byte equality without an early exit on the first differing byte. A length
/// mismatch returns immediately; credential lengths are not secret here.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.ct_eq(b).into()
}
