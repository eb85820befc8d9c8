//! The last two SASL messages, exchanged once the security context is complete.

use std::borrow::Cow;

use crate::security_layer::encode_final_response;
use crate::{AuthContext, AuthStatus, Error, ErrorKind, ProtectionLevel, Result, SecurityLayerOffer, SecurityProvider};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum WrapMode<'a> {
    /// Protect the caller's buffer as-is.
    Rewrap,
    /// Build and protect the client's security layer answer.
    Finalize { authorization_identity: &'a str },
}

impl<'a> From<Option<&'a str>> for WrapMode<'a> {
    fn from(authorization_identity: Option<&'a str>) -> Self {
        match authorization_identity {
            Some(authorization_identity) => WrapMode::Finalize { authorization_identity },
            None => WrapMode::Rewrap,
        }
    }
}

impl<P: SecurityProvider> AuthContext<P> {
    /// Removes the protection of the server's security layer message and decodes its offer.
    ///
    /// The bytes following the 4-byte offer become the pending response.
    #[instrument(level = "debug", ret, fields(state = ?self.state), skip_all)]
    pub fn unwrap(&mut self, server_challenge: &[u8]) -> Result<AuthStatus> {
        self.ensure_complete("unwrap")?;

        let Some(context) = self.handles.context_mut() else {
            return Err(Error::new(ErrorKind::State, "context handle has been released"));
        };

        let message = match self.provider.decrypt_message(context, server_challenge) {
            Ok(message) => message,
            Err(err) => return Err(self.fail(err.reclassify(ErrorKind::Negotiation))),
        };

        let (offer, rest) = match SecurityLayerOffer::decode(&message.data) {
            Ok(decoded) => decoded,
            Err(err) => return Err(self.fail(err)),
        };

        debug!(
            layers = ?offer.layers,
            max_message_size = offer.max_message_size,
            encrypted = message.encrypted,
            "server security layer offer"
        );

        self.pending = Some(rest.into());
        self.offer = Some(offer);
        self.response_conf = Some(message.encrypted);

        Ok(AuthStatus::Complete)
    }

    /// Protects a message for the server with integrity only.
    ///
    /// Without an authorization identity `input` is protected unchanged. With one, the final client response
    /// is built from the offer of the preceding [`unwrap`](Self::unwrap) (or, failing that, from the first
    /// four bytes of `input`) and protected instead. Either way the result becomes the pending response.
    pub fn wrap(&mut self, input: &[u8], authorization_identity: Option<&str>) -> Result<AuthStatus> {
        self.wrap_with(input, authorization_identity, false)
    }

    /// Same as [`wrap`](Self::wrap), with confidentiality on top of integrity when `protect` is set.
    #[instrument(level = "debug", ret, fields(state = ?self.state, protect = protect), skip_all)]
    pub fn wrap_with(
        &mut self,
        input: &[u8],
        authorization_identity: Option<&str>,
        protect: bool,
    ) -> Result<AuthStatus> {
        self.ensure_complete("wrap")?;

        let level = if protect {
            ProtectionLevel::Confidentiality
        } else {
            ProtectionLevel::Integrity
        };

        let (message, chosen) = match WrapMode::from(authorization_identity) {
            WrapMode::Rewrap => (Cow::Borrowed(input), None),
            WrapMode::Finalize { authorization_identity } => match self.final_response(input, authorization_identity) {
                Ok((chosen, response)) => (Cow::Owned(response), Some(chosen)),
                Err(err) => return Err(self.fail(err)),
            },
        };

        let Some(context) = self.handles.context_mut() else {
            return Err(Error::new(ErrorKind::State, "context handle has been released"));
        };

        let token = match self.provider.encrypt_message(context, &message, level) {
            Ok(token) => token,
            Err(err) => return Err(self.fail(err.reclassify(ErrorKind::Negotiation))),
        };

        trace!(input_len = message.len(), output_len = token.len(), %level, "message protected");

        self.pending = Some(token);

        if let Some(chosen) = chosen {
            self.chosen_protection = Some(chosen);

            self.query_principal();
            if self.principal.is_none() {
                warn!("authentication finished but the security provider did not disclose the principal name");
            }
        }

        Ok(AuthStatus::Complete)
    }

    fn final_response(&self, input: &[u8], authorization_identity: &str) -> Result<(ProtectionLevel, Vec<u8>)> {
        let offer = match self.offer {
            Some(offer) => offer,
            None => SecurityLayerOffer::decode(input)
                .map_err(|_| {
                    Error::new(
                        ErrorKind::Negotiation,
                        "no security layer offer: unwrap the server challenge first",
                    )
                })?
                .0,
        };

        let (level, max_message_size) = offer.choose(self.max_message_size)?;
        debug!(%level, max_message_size, "security layer chosen");

        Ok((level, encode_final_response(level, max_message_size, authorization_identity)))
    }
}

#[cfg(test)]
mod tests {
    use super::WrapMode;

    #[test]
    fn identity_selects_finalize() {
        assert_eq!(WrapMode::from(None), WrapMode::Rewrap);
        assert_eq!(
            WrapMode::from(Some("user@EXAMPLE.COM")),
            WrapMode::Finalize {
                authorization_identity: "user@EXAMPLE.COM"
            }
        );
    }
}
