use std::fmt;
use std::ops::Deref;

/// An opaque token exchanged between client and server.
///
/// The buffer is immutable once produced. A zero-length token is valid and distinct from the
/// absence of a token: some flows send an empty first client message.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct TokenBuffer(Box<[u8]>);

impl TokenBuffer {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(data.into().into_boxed_slice())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0.into_vec()
    }
}

impl Deref for TokenBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for TokenBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for TokenBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self(data.into_boxed_slice())
    }
}

impl From<&[u8]> for TokenBuffer {
    fn from(data: &[u8]) -> Self {
        Self(data.into())
    }
}

impl From<TokenBuffer> for Vec<u8> {
    fn from(token: TokenBuffer) -> Self {
        token.into_vec()
    }
}

impl PartialEq<[u8]> for TokenBuffer {
    fn eq(&self, other: &[u8]) -> bool {
        *self.0 == *other
    }
}

impl PartialEq<&[u8]> for TokenBuffer {
    fn eq(&self, other: &&[u8]) -> bool {
        *self.0 == **other
    }
}

impl fmt::Debug for TokenBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenBuffer({} bytes)", self.0.len())
    }
}
