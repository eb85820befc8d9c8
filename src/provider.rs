//! The contract a platform security provider (SSPI, MIT/Heimdal GSSAPI, a test double) has to satisfy.
//!
//! The provider does all the cryptography: it acquires credentials, produces and validates context tokens and
//! protects messages with the negotiated session key. [`AuthContext`](crate::AuthContext) only sequences the
//! calls and owns the handles the provider gives out.

use num_derive::{FromPrimitive, ToPrimitive};

use crate::{AuthIdentity, ChannelBindings, ContextRequirements, Mechanism, ProtectionLevel, Result, TokenBuffer};

/// Non-error outcome of a context initialization call. Values are the SSPI ones.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum ProviderStatus {
    Ok = 0,
    ContinueNeeded = 0x0009_0312,
}

/// Arguments of [`SecurityProvider::acquire_credentials`].
#[derive(Debug, Clone, Copy)]
pub struct AcquireCredentials<'a> {
    /// Client principal, `None` for the default one.
    pub principal: Option<&'a str>,
    /// Explicit identity, `None` for the ambient credentials.
    pub identity: Option<&'a AuthIdentity>,
    pub mechanism: Mechanism,
}

/// Arguments of [`SecurityProvider::initialize_context`].
pub struct InitializeContext<'a, CredsHandle, CtxHandle> {
    pub credentials_handle: &'a mut CredsHandle,
    /// Empty on the first call; the provider stores the handle of the new context in it.
    pub context_handle: &'a mut Option<CtxHandle>,
    pub target_name: &'a str,
    pub context_requirements: ContextRequirements,
    pub channel_bindings: Option<&'a ChannelBindings>,
    /// The last server token. Empty on the first call.
    pub input: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeContextResult {
    pub status: ProviderStatus,
    pub output: Option<TokenBuffer>,
}

/// Plaintext recovered by [`SecurityProvider::decrypt_message`].
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    pub data: Vec<u8>,
    /// `true` when the message had confidentiality protection, `false` when it was only signed.
    pub encrypted: bool,
}

impl std::fmt::Debug for DecryptedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedMessage")
            .field("len", &self.data.len())
            .field("encrypted", &self.encrypted)
            .finish()
    }
}

/// A platform security primitive.
///
/// Errors are reported with the crate [`Error`](crate::Error) type. The kind the provider picks is advisory:
/// the context re-classifies failures by the phase they happened in and only keeps
/// [`ErrorKind::UnsupportedFlag`](crate::ErrorKind::UnsupportedFlag) as-is. Native status codes should be put
/// in [`Error::status_code`](crate::Error::status_code).
pub trait SecurityProvider {
    type CredentialsHandle;
    type ContextHandle;

    /// Context requirements the provider is able to honour.
    fn supported_requirements(&self) -> ContextRequirements {
        ContextRequirements::all()
    }

    fn acquire_credentials(&mut self, request: AcquireCredentials<'_>) -> Result<Self::CredentialsHandle>;

    fn initialize_context(
        &mut self,
        request: InitializeContext<'_, Self::CredentialsHandle, Self::ContextHandle>,
    ) -> Result<InitializeContextResult>;

    /// Verifies and, if needed, decrypts a message protected by the peer.
    fn decrypt_message(&mut self, context: &mut Self::ContextHandle, message: &[u8]) -> Result<DecryptedMessage>;

    /// Protects `message` with at least integrity, plus confidentiality for [`ProtectionLevel::Confidentiality`].
    fn encrypt_message(
        &mut self,
        context: &mut Self::ContextHandle,
        message: &[u8],
        level: ProtectionLevel,
    ) -> Result<TokenBuffer>;

    fn query_principal_name(&mut self, context: &mut Self::ContextHandle) -> Result<String>;

    fn release_context(&mut self, context: Self::ContextHandle);

    fn release_credentials(&mut self, credentials: Self::CredentialsHandle);
}

impl<P: SecurityProvider + ?Sized> SecurityProvider for &mut P {
    type CredentialsHandle = P::CredentialsHandle;
    type ContextHandle = P::ContextHandle;

    fn supported_requirements(&self) -> ContextRequirements {
        (**self).supported_requirements()
    }

    fn acquire_credentials(&mut self, request: AcquireCredentials<'_>) -> Result<Self::CredentialsHandle> {
        (**self).acquire_credentials(request)
    }

    fn initialize_context(
        &mut self,
        request: InitializeContext<'_, Self::CredentialsHandle, Self::ContextHandle>,
    ) -> Result<InitializeContextResult> {
        (**self).initialize_context(request)
    }

    fn decrypt_message(&mut self, context: &mut Self::ContextHandle, message: &[u8]) -> Result<DecryptedMessage> {
        (**self).decrypt_message(context, message)
    }

    fn encrypt_message(
        &mut self,
        context: &mut Self::ContextHandle,
        message: &[u8],
        level: ProtectionLevel,
    ) -> Result<TokenBuffer> {
        (**self).encrypt_message(context, message, level)
    }

    fn query_principal_name(&mut self, context: &mut Self::ContextHandle) -> Result<String> {
        (**self).query_principal_name(context)
    }

    fn release_context(&mut self, context: Self::ContextHandle) {
        (**self).release_context(context)
    }

    fn release_credentials(&mut self, credentials: Self::CredentialsHandle) {
        (**self).release_credentials(credentials)
    }
}
