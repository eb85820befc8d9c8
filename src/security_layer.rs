//! The security layer negotiation that ends a SASL `GSSAPI` exchange
//! ([RFC 4752, section 3.1](https://www.rfc-editor.org/rfc/rfc4752#section-3.1)).
//!
//! After the context is established the server sends a wrapped 4-byte offer: a bitmask of the layers it
//! supports and the largest message it accepts. The client answers with a wrapped message made of the one
//! layer it picked, its own maximum size and the authorization identity.

use std::fmt;

use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};

use crate::config::MAX_MESSAGE_SIZE;
use crate::{Error, ErrorKind, Result};

bitflags! {
    /// Security layer bits of the offer and of the client's choice.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SecurityLayer: u8 {
        const NONE = 0x01;
        const INTEGRITY = 0x02;
        const CONFIDENTIALITY = 0x04;
    }
}

/// One security layer, ordered from weakest to strongest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtectionLevel {
    None,
    Integrity,
    Confidentiality,
}

impl ProtectionLevel {
    pub fn layer(self) -> SecurityLayer {
        match self {
            ProtectionLevel::None => SecurityLayer::NONE,
            ProtectionLevel::Integrity => SecurityLayer::INTEGRITY,
            ProtectionLevel::Confidentiality => SecurityLayer::CONFIDENTIALITY,
        }
    }

    /// Maps a single layer bit back to its level.
    pub fn from_layer(layer: SecurityLayer) -> Option<Self> {
        [
            ProtectionLevel::None,
            ProtectionLevel::Integrity,
            ProtectionLevel::Confidentiality,
        ]
        .into_iter()
        .find(|level| level.layer() == layer)
    }
}

impl fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectionLevel::None => f.write_str("none"),
            ProtectionLevel::Integrity => f.write_str("integrity"),
            ProtectionLevel::Confidentiality => f.write_str("confidentiality"),
        }
    }
}

/// The server's security layer offer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SecurityLayerOffer {
    pub layers: SecurityLayer,
    pub max_message_size: u32,
}

impl SecurityLayerOffer {
    pub const ENCODED_LEN: usize = 4;

    /// Splits an unwrapped server message into the offer and whatever follows it.
    ///
    /// Reserved bits of the mask are ignored.
    pub fn decode(data: &[u8]) -> Result<(Self, &[u8])> {
        if data.len() < Self::ENCODED_LEN {
            return Err(Error::new(
                ErrorKind::Negotiation,
                format!(
                    "security layer offer is too short: {} bytes, expected at least {}",
                    data.len(),
                    Self::ENCODED_LEN
                ),
            ));
        }

        let (header, rest) = data.split_at(Self::ENCODED_LEN);

        if header[0] & !SecurityLayer::all().bits() != 0 {
            trace!(mask = header[0], "ignoring reserved security layer bits");
        }

        let offer = Self {
            layers: SecurityLayer::from_bits_truncate(header[0]),
            max_message_size: BigEndian::read_u24(&header[1..]),
        };

        Ok((offer, rest))
    }

    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut encoded = [0; Self::ENCODED_LEN];
        encoded[0] = self.layers.bits();
        BigEndian::write_u24(&mut encoded[1..], self.max_message_size.min(MAX_MESSAGE_SIZE));

        encoded
    }

    /// Picks the layer the client answers with and the maximum size that goes with it.
    ///
    /// No layer is chosen whenever the server allows it. Otherwise the weakest offered layer is used and the
    /// size is the smaller of both sides' limits. An offer without any known layer cannot be answered.
    pub fn choose(&self, client_max_message_size: u32) -> Result<(ProtectionLevel, u32)> {
        if self.layers.contains(SecurityLayer::NONE) {
            return Ok((ProtectionLevel::None, 0));
        }

        let level = if self.layers.contains(SecurityLayer::INTEGRITY) {
            ProtectionLevel::Integrity
        } else if self.layers.contains(SecurityLayer::CONFIDENTIALITY) {
            ProtectionLevel::Confidentiality
        } else {
            return Err(Error::new(
                ErrorKind::Negotiation,
                "server offered no usable security layer",
            ));
        };

        let max_message_size = client_max_message_size
            .min(self.max_message_size)
            .min(MAX_MESSAGE_SIZE);

        Ok((level, max_message_size))
    }
}

/// Builds the client's answer: chosen layer, 3-byte maximum size and the authorization identity.
pub fn encode_final_response(level: ProtectionLevel, max_message_size: u32, authorization_identity: &str) -> Vec<u8> {
    let mut response = Vec::with_capacity(SecurityLayerOffer::ENCODED_LEN + authorization_identity.len());

    let mut size = [0; 3];
    BigEndian::write_u24(&mut size, max_message_size.min(MAX_MESSAGE_SIZE));

    response.push(level.layer().bits());
    response.extend_from_slice(&size);
    response.extend_from_slice(authorization_identity.as_bytes());

    response
}
