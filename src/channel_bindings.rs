use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde_derive::{Deserialize, Serialize};

use crate::{Error, ErrorKind, Result};

// size of SEC_CHANNEL_BINDINGS structure
const SEC_CHANNEL_BINDINGS_SIZE: usize = 32;

/// Binds the authentication to an outer channel, usually the TLS connection carrying it.
///
/// Serialized as [SEC_CHANNEL_BINDINGS](https://docs.microsoft.com/en-us/windows/win32/api/sspi/ns-sspi-sec_channel_bindings):
/// a 32-byte header of little-endian `(type, length, offset)` fields followed by the three data blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelBindings {
    pub initiator_addr_type: u32,
    pub initiator: Vec<u8>,
    pub acceptor_addr_type: u32,
    pub acceptor: Vec<u8>,
    pub application_data: Vec<u8>,
}

impl ChannelBindings {
    /// Channel bindings carrying only application data, e.g. `tls-server-end-point:<hash>`.
    pub fn from_application_data(application_data: impl Into<Vec<u8>>) -> Self {
        Self {
            application_data: application_data.into(),
            ..Default::default()
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let total =
            SEC_CHANNEL_BINDINGS_SIZE + self.initiator.len() + self.acceptor.len() + self.application_data.len();
        let mut buffer = Vec::with_capacity(total);

        let initiator_offset = SEC_CHANNEL_BINDINGS_SIZE;
        let acceptor_offset = initiator_offset + self.initiator.len();
        let application_offset = acceptor_offset + self.acceptor.len();

        let header = [
            self.initiator_addr_type as usize,
            self.initiator.len(),
            initiator_offset,
            self.acceptor_addr_type as usize,
            self.acceptor.len(),
            acceptor_offset,
            self.application_data.len(),
            application_offset,
        ];
        for field in header {
            let field = u32::try_from(field).map_err(|_| {
                Error::new(
                    ErrorKind::Negotiation,
                    format!("channel bindings are too large: {total} bytes"),
                )
            })?;
            buffer
                .write_u32::<LittleEndian>(field)
                .map_err(|err| Error::new(ErrorKind::Negotiation, format!("IO error: {err}")))?;
        }

        buffer.extend_from_slice(&self.initiator);
        buffer.extend_from_slice(&self.acceptor);
        buffer.extend_from_slice(&self.application_data);

        Ok(buffer)
    }

    pub fn from_bytes<T: AsRef<[u8]>>(data: T) -> Result<Self> {
        let data = data.as_ref();

        if data.len() < SEC_CHANNEL_BINDINGS_SIZE {
            return Err(Error::new(
                ErrorKind::Negotiation,
                format!(
                    "Invalid SEC_CHANNEL_BINDINGS buffer: buffer is too short: {}. Minimum len: {}",
                    data.len(),
                    SEC_CHANNEL_BINDINGS_SIZE,
                ),
            ));
        }

        let initiator_addr_type = LittleEndian::read_u32(&data[0..4]);
        let initiator = read_block(data, 4, "initiator")?;
        let acceptor_addr_type = LittleEndian::read_u32(&data[12..16]);
        let acceptor = read_block(data, 16, "acceptor")?;
        let application_data = read_block(data, 24, "application")?;

        Ok(Self {
            initiator_addr_type,
            initiator,
            acceptor_addr_type,
            acceptor,
            application_data,
        })
    }
}

/// Reads the `(length, offset)` pair at `field` and copies the block it points to.
fn read_block(data: &[u8], field: usize, name: &str) -> Result<Vec<u8>> {
    let len = LittleEndian::read_u32(&data[field..field + 4]) as usize;
    let offset = LittleEndian::read_u32(&data[field + 4..field + 8]) as usize;

    if len == 0 {
        return Ok(Vec::new());
    }

    let end = offset.checked_add(len).filter(|end| *end <= data.len()).ok_or_else(|| {
        Error::new(
            ErrorKind::Negotiation,
            format!(
                "Invalid SEC_CHANNEL_BINDINGS buffer: {name} offset + len ({}) goes outside the buffer ({})",
                offset.saturating_add(len),
                data.len()
            ),
        )
    })?;

    Ok(data[offset..end].to_vec())
}
