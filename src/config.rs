use std::fmt;

use serde_derive::{Deserialize, Serialize};

use crate::{AuthIdentity, ChannelBindings, ContextRequirements, Secret};

/// Largest value representable in the 3-byte size field of the security layer messages.
pub const MAX_MESSAGE_SIZE: u32 = 0x00FF_FFFF;

/// The GSSAPI mechanism the provider should negotiate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mechanism {
    /// Raw Kerberos V5, `1.2.840.113554.1.2.2`.
    #[default]
    Kerberos,
    /// SPNEGO, which lets the provider pick Kerberos or NTLM, `1.3.6.1.5.5.2`.
    Negotiate,
}

impl Mechanism {
    pub fn oid(self) -> &'static str {
        match self {
            Mechanism::Kerberos => "1.2.840.113554.1.2.2",
            Mechanism::Negotiate => "1.3.6.1.5.5.2",
        }
    }

    /// The SSPI security package implementing the mechanism.
    pub fn package_name(self) -> &'static str {
        match self {
            Mechanism::Kerberos => "Kerberos",
            Mechanism::Negotiate => "Negotiate",
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.package_name())
    }
}

/// Everything needed to start one negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Target service principal, e.g. `mongodb@db.example.com` or `MSSQLSvc/db.example.com:1433`.
    pub service_name: String,
    /// Client principal whose credentials to use; `None` selects the default principal.
    pub principal: Option<String>,
    pub identity: Option<AuthIdentity>,
    pub flags: ContextRequirements,
    pub mechanism: Mechanism,
    pub channel_bindings: Option<ChannelBindings>,
    /// Largest message the client is willing to receive once a security layer is in place.
    pub max_message_size: u32,
}

impl ClientConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            principal: None,
            identity: None,
            flags: ContextRequirements::default(),
            mechanism: Mechanism::default(),
            channel_bindings: None,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn with_identity(mut self, identity: AuthIdentity) -> Self {
        self.identity = (!identity.is_empty()).then_some(identity);
        self
    }

    pub fn with_user(mut self, username: impl Into<String>) -> Self {
        self.identity.get_or_insert_with(AuthIdentity::default).username = Some(username.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.identity.get_or_insert_with(AuthIdentity::default).domain = Some(domain.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<Secret<String>>) -> Self {
        self.identity.get_or_insert_with(AuthIdentity::default).password = Some(password.into());
        self
    }

    pub fn with_flags(mut self, flags: ContextRequirements) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_mechanism(mut self, mechanism: Mechanism) -> Self {
        self.mechanism = mechanism;
        self
    }

    pub fn with_channel_bindings(mut self, channel_bindings: ChannelBindings) -> Self {
        self.channel_bindings = Some(channel_bindings);
        self
    }

    /// Values above [`MAX_MESSAGE_SIZE`] are clamped since they do not fit the wire format.
    pub fn with_max_message_size(mut self, max_message_size: u32) -> Self {
        self.max_message_size = max_message_size.min(MAX_MESSAGE_SIZE);
        self
    }
}
