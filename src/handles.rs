use std::fmt;
use std::marker::PhantomData;

use crate::SecurityProvider;

/// The credentials and context handles a provider handed out for one negotiation.
///
/// Handles are released explicitly through [`ProviderHandles::release`]; the owning
/// [`AuthContext`](crate::AuthContext) does it when the negotiation fails and when it is dropped.
pub struct ProviderHandles<P: SecurityProvider> {
    credentials: Option<P::CredentialsHandle>,
    context: Option<P::ContextHandle>,
    _provider: PhantomData<fn(P)>,
}

impl<P: SecurityProvider> ProviderHandles<P> {
    pub fn new(credentials: P::CredentialsHandle) -> Self {
        Self {
            credentials: Some(credentials),
            context: None,
            _provider: PhantomData,
        }
    }

    /// Credentials handle together with the (possibly not yet created) context handle slot.
    pub fn split_mut(&mut self) -> Option<(&mut P::CredentialsHandle, &mut Option<P::ContextHandle>)> {
        let credentials = self.credentials.as_mut()?;

        Some((credentials, &mut self.context))
    }

    pub fn context_mut(&mut self) -> Option<&mut P::ContextHandle> {
        self.context.as_mut()
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn is_released(&self) -> bool {
        self.credentials.is_none() && self.context.is_none()
    }

    /// Returns every handle to the provider. Calling it again is a no-op.
    pub fn release(&mut self, provider: &mut P) {
        if let Some(context) = self.context.take() {
            trace!("releasing context handle");
            provider.release_context(context);
        }

        if let Some(credentials) = self.credentials.take() {
            trace!("releasing credentials handle");
            provider.release_credentials(credentials);
        }
    }
}

impl<P: SecurityProvider> fmt::Debug for ProviderHandles<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandles")
            .field("credentials", &self.credentials.is_some())
            .field("context", &self.context.is_some())
            .finish()
    }
}
