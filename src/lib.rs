//! Client side of the SASL `GSSAPI` mechanism ([RFC 4752](https://www.rfc-editor.org/rfc/rfc4752)).
//!
//! The crate drives one authentication exchange against a remote service:
//!
//! 1. [`AuthContext::create`] acquires credentials through a [`SecurityProvider`];
//! 2. [`AuthContext::step`] is called with every server token until it returns [`AuthStatus::Complete`],
//!    and [`AuthContext::response`] yields the token to send back after each call;
//! 3. [`AuthContext::unwrap`] decodes the server's security layer offer and [`AuthContext::wrap`] produces
//!    the final client message carrying the chosen layer and the authorization identity.
//!
//! Cryptography, credential stores and the transport are out of scope: they are reached through the
//! [`SecurityProvider`] trait, which a binding to SSPI, MIT/Heimdal GSSAPI or a test double implements.
//!
//! ```no_run
//! # use sasl_gssapi::{AuthContext, AuthStatus, ClientConfig, ContextRequirements, SecurityProvider};
//! # fn send(_: &[u8]) -> Vec<u8> { unimplemented!() }
//! # fn run<P: SecurityProvider>(provider: P) -> sasl_gssapi::Result<()> {
//! let config = ClientConfig::new("mongodb@db.example.com").with_flags(ContextRequirements::MUTUAL);
//! let (_, mut context) = AuthContext::create(provider, &config)?;
//!
//! let mut server_token = Vec::new();
//! while context.step(&server_token)? == AuthStatus::Continue {
//!     let token = context.response().unwrap_or_default();
//!     server_token = send(&token);
//! }
//! # let token = context.response().unwrap_or_default();
//! # server_token = send(&token);
//!
//! context.unwrap(&server_token)?;
//! let offer = context.response().unwrap_or_default();
//! context.wrap(&offer, Some("user@EXAMPLE.COM"))?;
//! send(&context.response().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

pub mod auth_identity;
pub mod channel_bindings;
pub mod config;
pub mod context;
pub mod flags;
pub mod handles;
mod protect;
pub mod provider;
pub mod secret;
pub mod security_layer;
pub mod token;

use std::{error, fmt, result, str, string};

use num_derive::{FromPrimitive, ToPrimitive};

pub use self::{
    auth_identity::AuthIdentity,
    channel_bindings::ChannelBindings,
    config::{ClientConfig, Mechanism},
    context::{AuthContext, ContextState},
    flags::ContextRequirements,
    handles::ProviderHandles,
    provider::{
        AcquireCredentials, DecryptedMessage, InitializeContext, InitializeContextResult, ProviderStatus,
        SecurityProvider,
    },
    secret::Secret,
    security_layer::{ProtectionLevel, SecurityLayer, SecurityLayerOffer},
    token::TokenBuffer,
};

pub type Result<T> = result::Result<T, Error>;

/// Outcome of a successful negotiation operation.
///
/// The numeric values match the `AUTH_GSS_*` constants of the classic Kerberos client bindings,
/// `Complete` (`1`) doubling as the generic success of [`AuthContext::wrap`] and [`AuthContext::unwrap`].
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum AuthStatus {
    Continue = 0,
    Complete = 1,
}

/// The class of an error. The set is closed: every failure surfaced by this crate is one of these.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum ErrorKind {
    /// Credentials could not be acquired: unknown principal, bad password, unknown domain.
    Credential = 1,
    /// The operation is not valid in the current [`ContextState`].
    State = 2,
    /// The provider rejected a token, a signature check failed, a ticket expired or a name could not be resolved.
    Negotiation = 3,
    /// A requested capability is not supported by the provider.
    UnsupportedFlag = 4,
}

/// Holds the [`ErrorKind`], a description of the error and, when the provider reported one, its native status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub error_type: ErrorKind,
    pub description: String,
    pub status_code: Option<u32>,
}

impl Error {
    /// Allows to fill a new error easily, supplying it with a coherent description.
    pub fn new(error_type: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            error_type,
            description: description.into(),
            status_code: None,
        }
    }

    /// Same as [`Error::new`] but also records the provider-native status code (e.g. an SSPI `SEC_E_*` value).
    pub fn with_status(error_type: ErrorKind, description: impl Into<String>, status_code: u32) -> Self {
        Self {
            error_type,
            description: description.into(),
            status_code: Some(status_code),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error_type
    }

    /// Keeps the description and status code but moves the error into another class.
    ///
    /// `UnsupportedFlag` is never reclassified: a provider that refuses a capability says so explicitly.
    pub(crate) fn reclassify(self, error_type: ErrorKind) -> Self {
        if self.error_type == ErrorKind::UnsupportedFlag {
            return self;
        }

        Self { error_type, ..self }
    }
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.error_type, self.description)?;

        if let Some(code) = self.status_code {
            write!(f, " (status 0x{code:08X})")?;
        }

        Ok(())
    }
}

impl From<str::Utf8Error> for Error {
    fn from(err: str::Utf8Error) -> Self {
        Self::new(ErrorKind::Negotiation, format!("UTF-8 error: {err}"))
    }
}

impl From<string::FromUtf8Error> for Error {
    fn from(err: string::FromUtf8Error) -> Self {
        Self::new(ErrorKind::Negotiation, format!("UTF-8 error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use num_traits::{FromPrimitive, ToPrimitive};

    use super::*;

    #[test]
    fn status_values_match_classic_bindings() {
        assert_eq!(AuthStatus::Continue.to_i32(), Some(0));
        assert_eq!(AuthStatus::Complete.to_i32(), Some(1));
        assert_eq!(AuthStatus::from_i32(1), Some(AuthStatus::Complete));
        assert_eq!(AuthStatus::from_i32(-1), None);
    }

    #[test]
    fn display_includes_status_code() {
        let error = Error::with_status(ErrorKind::Negotiation, "clock skew too great", 0x8009_0324);

        assert_eq!(error.to_string(), "Negotiation: clock skew too great (status 0x80090324)");
        assert_eq!(Error::new(ErrorKind::State, "done").to_string(), "State: done");
    }

    #[test]
    fn reclassify_keeps_diagnostics() {
        let error =
            Error::with_status(ErrorKind::Negotiation, "logon denied", 0x8009_030C).reclassify(ErrorKind::Credential);

        assert_eq!(error.error_type, ErrorKind::Credential);
        assert_eq!(error.description, "logon denied");
        assert_eq!(error.status_code, Some(0x8009_030C));

        let unsupported = Error::new(ErrorKind::UnsupportedFlag, "no delegation").reclassify(ErrorKind::Negotiation);
        assert_eq!(unsupported.kind(), ErrorKind::UnsupportedFlag);
    }

    #[test]
    fn error_kind_is_a_closed_numeric_set() {
        assert_eq!(ErrorKind::from_u32(2), Some(ErrorKind::State));
        assert_eq!(ErrorKind::from_u32(5), None);
    }
}
