//! RKS tape-image format: a 4-byte little-endian header (start, end
//! address), the program content, and a trailing 2-byte little-endian
//! checksum (SPEC_FULL.md §6.3).

use std::fmt;
use std::io::{self, Read};

#[derive(Debug)]
pub enum RksError {
    Io(io::Error),
    /// Fewer than 4 header bytes arrived.
    ShortHeader,
    /// The content ended before a 2-byte checksum could be read.
    MissingChecksum,
    LengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for RksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RksError::Io(e) => write!(f, "failed to read RKS image: {e}"),
            RksError::ShortHeader => write!(f, "failed to read the header: fewer than 4 bytes available"),
            RksError::MissingChecksum => write!(f, "not enough data for the checksum"),
            RksError::LengthMismatch { expected, actual } => {
                write!(f, "content length does not match the addresses: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for RksError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RksError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RksError {
    fn from(e: io::Error) -> Self {
        RksError::Io(e)
    }
}

/// A parsed tape image: the memory range it targets and the bytes that
/// go there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RksImage {
    pub start_address: u16,
    pub end_address: u16,
    pub checksum: u16,
    pub content: Vec<u8>,
}

/// Parse an RKS image from `input`. The checksum is read back but not
/// verified here (SPEC_FULL.md §6.3: "not validated against content by
/// this core") — it's surfaced for a caller that wants to check it.
pub fn read_rks<R: Read>(mut input: R) -> Result<RksImage, RksError> {
    let mut header = [0u8; 4];
    input.read_exact(&mut header).map_err(|_| RksError::ShortHeader)?;
    let start_address = u16::from_le_bytes([header[0], header[1]]);
    let end_address = u16::from_le_bytes([header[2], header[3]]);

    let mut rest = Vec::new();
    input.read_to_end(&mut rest)?;
    if rest.len() < 2 {
        return Err(RksError::MissingChecksum);
    }
    let split = rest.len() - 2;
    let checksum = u16::from_le_bytes([rest[split], rest[split + 1]]);
    let content = rest[..split].to_vec();

    let expected_len = end_address.wrapping_sub(start_address) as usize + 1;
    if content.len() != expected_len {
        return Err(RksError::LengthMismatch { expected: expected_len, actual: content.len() });
    }

    Ok(RksImage { start_address, end_address, checksum, content })
}
