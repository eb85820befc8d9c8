use std::fmt;

use crate::provider::{AcquireCredentials, InitializeContext, InitializeContextResult, ProviderStatus};
use crate::{
    AuthStatus, ChannelBindings, ClientConfig, ContextRequirements, Error, ErrorKind, ProtectionLevel,
    ProviderHandles, Result, SecurityLayerOffer, SecurityProvider, TokenBuffer,
};

/// Where a negotiation stands. Transitions only go forward, and `Failed` is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContextState {
    Created,
    Continue,
    Complete,
    Failed,
}

/// One client-side SASL `GSSAPI` negotiation.
///
/// The context owns its provider and the handles the provider gave out; they are released when the
/// negotiation fails and when the context is dropped. It is meant to be driven by a single caller: nothing
/// in here is synchronized, but distinct contexts are fully independent.
pub struct AuthContext<P: SecurityProvider> {
    pub(crate) provider: P,
    pub(crate) handles: ProviderHandles<P>,
    pub(crate) state: ContextState,

    service_name: String,
    requirements: ContextRequirements,
    channel_bindings: Option<ChannelBindings>,
    pub(crate) max_message_size: u32,

    pub(crate) pending: Option<TokenBuffer>,
    pub(crate) principal: Option<String>,
    pub(crate) offer: Option<SecurityLayerOffer>,
    pub(crate) chosen_protection: Option<ProtectionLevel>,
    pub(crate) response_conf: Option<bool>,
}

impl<P: SecurityProvider> AuthContext<P> {
    /// Acquires credentials and returns a context ready to [`step`](Self::step).
    ///
    /// The returned status is always [`AuthStatus::Complete`]: it means the context can start negotiating,
    /// not that the negotiation is finished. The context itself starts in [`ContextState::Created`].
    #[instrument(level = "debug", skip_all, fields(service = %config.service_name, mechanism = %config.mechanism))]
    pub fn create(mut provider: P, config: &ClientConfig) -> Result<(AuthStatus, Self)> {
        if config.service_name.trim().is_empty() {
            return Err(Error::new(ErrorKind::Negotiation, "service name must not be empty"));
        }

        let unsupported = config.flags.difference(provider.supported_requirements());
        if !unsupported.is_empty() {
            return Err(Error::new(
                ErrorKind::UnsupportedFlag,
                format!("the security provider does not support {unsupported:?}"),
            ));
        }

        let credentials = provider
            .acquire_credentials(AcquireCredentials {
                principal: config.principal.as_deref(),
                identity: config.identity.as_ref(),
                mechanism: config.mechanism,
            })
            .map_err(|err| {
                error!(%err, "credentials acquisition failed");
                err.reclassify(ErrorKind::Credential)
            })?;
        debug!(explicit_identity = config.identity.is_some(), "credentials acquired");

        let context = Self {
            provider,
            handles: ProviderHandles::new(credentials),
            state: ContextState::Created,
            service_name: config.service_name.clone(),
            requirements: config.flags,
            channel_bindings: config.channel_bindings.clone(),
            max_message_size: config.max_message_size,
            pending: None,
            principal: None,
            offer: None,
            chosen_protection: None,
            response_conf: None,
        };

        Ok((AuthStatus::Complete, context))
    }

    /// Feeds the latest server token (empty on the first call) to the provider.
    ///
    /// The token the provider produced, if any, replaces the pending response.
    #[instrument(level = "debug", ret, fields(state = ?self.state), skip_all)]
    pub fn step(&mut self, server_token: &[u8]) -> Result<AuthStatus> {
        match self.state {
            ContextState::Created | ContextState::Continue => {}
            state => {
                return Err(Error::new(
                    ErrorKind::State,
                    format!("step is not valid once the context is {state:?}"),
                ))
            }
        }

        let Self {
            provider,
            handles,
            service_name,
            requirements,
            channel_bindings,
            ..
        } = self;

        let Some((credentials_handle, context_handle)) = handles.split_mut() else {
            return Err(Error::new(ErrorKind::State, "credentials handle has been released"));
        };

        trace!(input_len = server_token.len(), "initializing security context");

        let result = provider.initialize_context(InitializeContext {
            credentials_handle,
            context_handle,
            target_name: service_name,
            context_requirements: *requirements,
            channel_bindings: channel_bindings.as_ref(),
            input: server_token,
        });

        let InitializeContextResult { status, output } = match result {
            Ok(result) => result,
            Err(err) => return Err(self.fail(err.reclassify(ErrorKind::Negotiation))),
        };

        if !self.handles.has_context() {
            return Err(self.fail(Error::new(
                ErrorKind::Negotiation,
                "security provider did not return a context handle",
            )));
        }

        debug!(?status, output_len = output.as_ref().map(|token| token.len()), "security context initialized");

        self.pending = output;

        match status {
            ProviderStatus::ContinueNeeded => {
                self.state = ContextState::Continue;

                Ok(AuthStatus::Continue)
            }
            ProviderStatus::Ok => {
                self.state = ContextState::Complete;
                self.query_principal();

                Ok(AuthStatus::Complete)
            }
        }
    }

    /// Takes the pending output token. `None` when there is nothing to send.
    pub fn response(&mut self) -> Option<TokenBuffer> {
        self.pending.take()
    }

    /// The authenticated principal name, once the context is complete and the provider disclosed it.
    pub fn username(&self) -> Option<&str> {
        match self.state {
            ContextState::Complete => self.principal.as_deref(),
            _ => None,
        }
    }

    /// Whether the message handled by the last [`unwrap`](Self::unwrap) had been encrypted.
    pub fn response_conf(&self) -> Option<bool> {
        self.response_conf
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == ContextState::Complete
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn requirements(&self) -> ContextRequirements {
        self.requirements
    }

    /// The server's offer decoded by the last [`unwrap`](Self::unwrap).
    pub fn security_layer(&self) -> Option<SecurityLayerOffer> {
        self.offer
    }

    /// The layer picked by the last finalizing [`wrap`](Self::wrap).
    pub fn chosen_protection(&self) -> Option<ProtectionLevel> {
        self.chosen_protection
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Ends the negotiation and releases the provider handles.
    pub fn release(mut self) {
        self.handles.release(&mut self.provider);
    }

    pub(crate) fn ensure_complete(&self, operation: &str) -> Result<()> {
        match self.state {
            ContextState::Complete => Ok(()),
            state => Err(Error::new(
                ErrorKind::State,
                format!("{operation} requires a complete context, but it is {state:?}"),
            )),
        }
    }

    /// Moves the context to `Failed`, dropping the pending token and releasing every handle.
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        error!(%err, state = ?self.state, "negotiation failed");

        self.state = ContextState::Failed;
        self.pending = None;
        self.handles.release(&mut self.provider);

        err
    }

    /// Asks the provider for the principal name once; the first answer is kept for good.
    pub(crate) fn query_principal(&mut self) {
        if self.principal.is_some() {
            return;
        }

        let Some(context) = self.handles.context_mut() else {
            return;
        };

        match self.provider.query_principal_name(context) {
            Ok(name) if !name.is_empty() => {
                debug!(principal = %name, "authenticated principal known");
                self.principal = Some(name);
            }
            Ok(_) => debug!("security provider returned an empty principal name"),
            Err(err) => debug!(%err, "principal name not available yet"),
        }
    }
}

impl<P: SecurityProvider> Drop for AuthContext<P> {
    fn drop(&mut self) {
        self.handles.release(&mut self.provider);
    }
}

impl<P: SecurityProvider> fmt::Debug for AuthContext<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("state", &self.state)
            .field("service_name", &self.service_name)
            .field("requirements", &self.requirements)
            .field("handles", &self.handles)
            .field("pending", &self.pending)
            .field("principal", &self.principal)
            .field("offer", &self.offer)
            .finish_non_exhaustive()
    }
}
