#![allow(dead_code)]

use std::sync::Once;

use sasl_gssapi::{
    AcquireCredentials, ChannelBindings, ContextRequirements, DecryptedMessage, Error, ErrorKind, InitializeContext,
    InitializeContextResult, ProtectionLevel, ProviderStatus, Result, SecurityProvider, TokenBuffer,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const SERVICE: &str = "test";
pub const PRINCIPAL: &str = "user@EXAMPLE.COM";
pub const KEY: u8 = 0x5A;

/// `SEC_E_MESSAGE_ALTERED`
pub const MESSAGE_ALTERED: u32 = 0x8009_030F;
/// `SEC_E_LOGON_DENIED`
pub const LOGON_DENIED: u32 = 0x8009_030C;
/// `SEC_E_INVALID_TOKEN`
pub const INVALID_TOKEN: u32 = 0x8009_0308;
/// `SEC_E_CONTEXT_EXPIRED`
pub const CONTEXT_EXPIRED: u32 = 0x8009_0317;

static SETUP: Once = Once::new();

pub fn init_logging() {
    SETUP.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .with(EnvFilter::from_env("SASL_GSSAPI_LOG_LEVEL"))
            .try_init();
    });
}

/// Token the fake server sends after the client token of `round`.
pub fn server_token(round: usize) -> Vec<u8> {
    format!("server-{round}").into_bytes()
}

/// Token the fake client produces in `round`.
pub fn client_token(round: usize) -> Vec<u8> {
    format!("client-{round}").into_bytes()
}

/// The session "protection": a confidentiality marker, the payload (XORed with the key when encrypted) and a
/// keyed checksum.
pub fn seal(key: u8, data: &[u8], encrypt: bool) -> Vec<u8> {
    let mut token = Vec::with_capacity(data.len() + 2);

    token.push(u8::from(encrypt));
    if encrypt {
        token.extend(data.iter().map(|byte| byte ^ key));
    } else {
        token.extend_from_slice(data);
    }
    token.push(checksum(key, data));

    token
}

pub fn open(key: u8, token: &[u8]) -> Result<(Vec<u8>, bool)> {
    let altered = || Error::with_status(ErrorKind::Negotiation, "message altered", MESSAGE_ALTERED);

    let [marker, body @ .., sum] = token else {
        return Err(altered());
    };

    let encrypted = match *marker {
        0 => false,
        1 => true,
        _ => return Err(altered()),
    };

    let data: Vec<u8> = if encrypted {
        body.iter().map(|byte| byte ^ key).collect()
    } else {
        body.to_vec()
    };

    if checksum(key, &data) != *sum {
        return Err(altered());
    }

    Ok((data, encrypted))
}

fn checksum(key: u8, data: &[u8]) -> u8 {
    data.iter().fold(key, |sum, byte| sum.wrapping_add(*byte).rotate_left(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub id: u32,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Context {
    pub id: u32,
    pub round: usize,
}

/// A deterministic in-process security provider with a scripted server on the other side.
#[derive(Debug)]
pub struct ScriptedProvider {
    pub key: u8,
    /// Number of `initialize_context` calls until the context is established.
    pub rounds: usize,
    /// Plaintext of the server's security layer message.
    pub server_offer: Vec<u8>,
    pub encrypt_offer: bool,
    pub principal: Option<String>,
    pub supported: ContextRequirements,

    pub fail_acquire: bool,
    pub fail_round: Option<usize>,
    pub fail_encrypt: bool,
    /// Report success from `initialize_context` without ever creating a context handle.
    pub withhold_context: bool,

    pub next_id: u32,
    pub acquired: Vec<AcquiredWith>,
    pub last_target: Option<String>,
    pub last_requirements: Option<ContextRequirements>,
    pub last_channel_bindings: Option<ChannelBindings>,
    pub encrypted_levels: Vec<ProtectionLevel>,
    pub released_contexts: Vec<u32>,
    pub released_credentials: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredWith {
    pub principal: Option<String>,
    pub username: Option<String>,
    pub domain: Option<String>,
    pub has_password: bool,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self {
            key: KEY,
            rounds: 2,
            server_offer: vec![0x07, 0x01, 0x00, 0x00],
            encrypt_offer: false,
            principal: Some(PRINCIPAL.to_owned()),
            supported: ContextRequirements::all(),
            fail_acquire: false,
            fail_round: None,
            fail_encrypt: false,
            withhold_context: false,
            next_id: 1,
            acquired: Vec::new(),
            last_target: None,
            last_requirements: None,
            last_channel_bindings: None,
            encrypted_levels: Vec::new(),
            released_contexts: Vec::new(),
            released_credentials: Vec::new(),
        }
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_offer(mut self, offer: &[u8]) -> Self {
        self.server_offer = offer.to_vec();
        self
    }

    /// The server's wrapped security layer message.
    pub fn server_challenge(&self) -> Vec<u8> {
        seal(self.key, &self.server_offer, self.encrypt_offer)
    }

    /// What the server reads out of a client message.
    pub fn peer_open(&self, token: &[u8]) -> (Vec<u8>, bool) {
        open(self.key, token).expect("client message must verify")
    }

    pub fn peer_seal(&self, data: &[u8], encrypt: bool) -> Vec<u8> {
        seal(self.key, data, encrypt)
    }

    /// Nothing handed out is still alive.
    pub fn all_released(&self) -> bool {
        let handed_out = self.next_id as usize - 1;

        self.released_contexts.len() + self.released_credentials.len() == handed_out
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        id
    }
}

impl SecurityProvider for ScriptedProvider {
    type CredentialsHandle = Credentials;
    type ContextHandle = Context;

    fn supported_requirements(&self) -> ContextRequirements {
        self.supported
    }

    fn acquire_credentials(&mut self, request: AcquireCredentials<'_>) -> Result<Self::CredentialsHandle> {
        if self.fail_acquire {
            return Err(Error::with_status(ErrorKind::Negotiation, "logon denied", LOGON_DENIED));
        }

        self.acquired.push(AcquiredWith {
            principal: request.principal.map(str::to_owned),
            username: request.identity.and_then(|identity| identity.username.clone()),
            domain: request.identity.and_then(|identity| identity.domain.clone()),
            has_password: request.identity.is_some_and(|identity| identity.password.is_some()),
        });

        Ok(Credentials { id: self.next_id() })
    }

    fn initialize_context(
        &mut self,
        request: InitializeContext<'_, Self::CredentialsHandle, Self::ContextHandle>,
    ) -> Result<InitializeContextResult> {
        let round = request.context_handle.as_ref().map_or(0, |context| context.round);

        self.last_target = Some(request.target_name.to_owned());
        self.last_requirements = Some(request.context_requirements);
        self.last_channel_bindings = request.channel_bindings.cloned();

        if self.fail_round == Some(round) {
            return Err(Error::with_status(ErrorKind::Negotiation, "invalid token", INVALID_TOKEN));
        }

        let expected = if round == 0 { Vec::new() } else { server_token(round - 1) };
        if request.input != expected.as_slice() {
            return Err(Error::with_status(
                ErrorKind::Negotiation,
                format!("unexpected server token in round {round}"),
                INVALID_TOKEN,
            ));
        }

        if self.withhold_context {
            return Ok(InitializeContextResult {
                status: ProviderStatus::Ok,
                output: Some(TokenBuffer::from(client_token(round))),
            });
        }

        if request.context_handle.is_none() {
            let id = self.next_id();
            *request.context_handle = Some(Context { id, round: 0 });
        }
        if let Some(context) = request.context_handle.as_mut() {
            context.round = round + 1;
        }

        let status = if round + 1 < self.rounds {
            ProviderStatus::ContinueNeeded
        } else {
            ProviderStatus::Ok
        };

        Ok(InitializeContextResult {
            status,
            output: Some(TokenBuffer::from(client_token(round))),
        })
    }

    fn decrypt_message(&mut self, _context: &mut Self::ContextHandle, message: &[u8]) -> Result<DecryptedMessage> {
        let (data, encrypted) = open(self.key, message)?;

        Ok(DecryptedMessage { data, encrypted })
    }

    fn encrypt_message(
        &mut self,
        _context: &mut Self::ContextHandle,
        message: &[u8],
        level: ProtectionLevel,
    ) -> Result<TokenBuffer> {
        self.encrypted_levels.push(level);

        if self.fail_encrypt {
            return Err(Error::with_status(ErrorKind::Credential, "context expired", CONTEXT_EXPIRED));
        }

        Ok(seal(self.key, message, level == ProtectionLevel::Confidentiality).into())
    }

    fn query_principal_name(&mut self, _context: &mut Self::ContextHandle) -> Result<String> {
        self.principal
            .clone()
            .ok_or_else(|| Error::new(ErrorKind::Negotiation, "principal name is not available"))
    }

    fn release_context(&mut self, context: Self::ContextHandle) {
        self.released_contexts.push(context.id);
    }

    fn release_credentials(&mut self, credentials: Self::CredentialsHandle) {
        self.released_credentials.push(credentials.id);
    }
}
