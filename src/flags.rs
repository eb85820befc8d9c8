use bitflags::bitflags;
use serde_derive::{Deserialize, Serialize};

use crate::{Error, ErrorKind, Result};

bitflags! {
    /// Context requirements requested by the client, using the `GSS_C_*_FLAG` values.
    ///
    /// Only [`ContextRequirements::MUTUAL`] has semantics of its own in the SASL exchange; the other flags are
    /// forwarded to the provider as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ContextRequirements: u32 {
        const DELEGATE = 0x1;
        const MUTUAL = 0x2;
        const REPLAY_DETECT = 0x4;
        const SEQUENCE_DETECT = 0x8;
        const CONFIDENTIALITY = 0x10;
        const INTEGRITY = 0x20;
        const ANONYMOUS = 0x40;
    }
}

impl ContextRequirements {
    /// Parses raw `GSS_C_*` bits, rejecting any bit this crate does not know about.
    pub fn from_raw(bits: u32) -> Result<Self> {
        Self::from_bits(bits).ok_or_else(|| {
            Error::new(
                ErrorKind::UnsupportedFlag,
                format!(
                    "unknown context requirement bits: 0x{:X}",
                    bits & !Self::all().bits()
                ),
            )
        })
    }
}

impl Default for ContextRequirements {
    fn default() -> Self {
        Self::MUTUAL | Self::SEQUENCE_DETECT
    }
}
