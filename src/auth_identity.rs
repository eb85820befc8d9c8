use serde_derive::{Deserialize, Serialize};

use crate::Secret;

/// An explicit identity to acquire credentials for, instead of the ambient (logged-on or cached) one.
///
/// Every part is optional: SSPI-style providers accept, for instance, a user name and domain without a
/// password and fall back to stored credentials for that account.
///
/// # MSDN
///
/// * [SEC_WINNT_AUTH_IDENTITY_W structure](https://docs.microsoft.com/en-us/windows/win32/api/sspi/ns-sspi-sec_winnt_auth_identity_w)
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub username: Option<String>,
    pub domain: Option<String>,
    pub password: Option<Secret<String>>,
}

impl AuthIdentity {
    pub fn new(username: impl Into<String>, domain: Option<&str>, password: impl Into<Secret<String>>) -> Self {
        Self {
            username: Some(username.into()),
            domain: domain.map(ToOwned::to_owned),
            password: Some(password.into()),
        }
    }

    /// Returns `true` when no part of the identity is set, i.e. the ambient credentials should be used.
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.domain.is_none() && self.password.is_none()
    }

    /// Builds the identity from the three optional parts, returning `None` when all of them are absent.
    pub fn from_parts(username: Option<&str>, domain: Option<&str>, password: Option<&str>) -> Option<Self> {
        let identity = Self {
            username: username.map(ToOwned::to_owned),
            domain: domain.map(ToOwned::to_owned),
            password: password.map(Secret::from),
        };

        (!identity.is_empty()).then_some(identity)
    }

    /// `DOMAIN\user` when a domain is set, otherwise the bare user name.
    pub fn account_name(&self) -> Option<String> {
        let username = self.username.as_deref()?;

        Some(match self.domain.as_deref() {
            Some(domain) => format!("{domain}\\{username}"),
            None => username.to_owned(),
        })
    }
}
