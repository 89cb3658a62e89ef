//! Wire frames
//!
//! # Frame Format
//! - Byte 0: Device address of the target board
//! - Byte 1: Opcode, taken from the board's [`OpcodeTable`](crate::OpcodeTable)
//! - Bytes 2..n: Operands, fixed width per [`OpcodeFamily`]
//! - Byte n: Checksum
//!
//! The checksum is the two's complement of the byte sum of everything before it, so
//! the byte sum of a complete frame is 0 modulo 256. Device replies follow the same
//! rule.

use crate::{opcodes::OpcodeFamily, DecodeError, StatusResponse};

use super::status;

/// Longest frame any opcode family produces
pub const MAX_FRAME_LEN: usize = 7;

/// Checksum byte for the given frame prefix
///
/// Appending the result to `bytes` makes the byte sum 0 modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    byte_sum(bytes).wrapping_neg()
}

/// Whether `bytes` sum to 0 modulo 256
pub fn is_zero_sum(bytes: &[u8]) -> bool {
    byte_sum(bytes) == 0
}

fn byte_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

/// A complete, checksummed command frame
///
/// Frames are produced by [`Command::encode`](crate::Command::encode) and stored
/// inline; [`Frame::as_bytes`] is exactly what goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    family: OpcodeFamily,
    len: u8,
    bytes: [u8; MAX_FRAME_LEN],
}

impl Frame {
    pub(crate) fn seal(
        family: OpcodeFamily,
        device_address: u8,
        opcode: u8,
        operands: &[u8],
    ) -> Self {
        debug_assert_eq!(operands.len(), family.operand_len());

        let mut bytes = [0u8; MAX_FRAME_LEN];
        bytes[0] = device_address;
        bytes[1] = opcode;
        let end = 2 + operands.len();
        bytes[2..end].copy_from_slice(operands);
        bytes[end] = checksum(&bytes[..end]);

        Self {
            family,
            len: (end + 1) as u8,
            bytes,
        }
    }

    /// The bytes to transmit
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Command family this frame belongs to
    pub fn family(&self) -> OpcodeFamily {
        self.family
    }

    /// Device address of the target board
    pub fn device_address(&self) -> u8 {
        self.bytes[0]
    }

    /// Opcode byte
    pub fn opcode(&self) -> u8 {
        self.bytes[1]
    }

    /// Operand bytes between opcode and checksum
    pub fn operands(&self) -> &[u8] {
        &self.bytes[2..self.len as usize - 1]
    }

    /// Trailing checksum byte
    pub fn checksum(&self) -> u8 {
        self.bytes[self.len as usize - 1]
    }

    /// Number of reply bytes the board sends for this frame, when it replies at all
    pub fn reply_len(&self) -> usize {
        self.family.reply_len()
    }

    /// Decodes the board's reply to this frame
    ///
    /// Besides the checks of [`decode`](crate::decode), the reply must echo this
    /// frame's device address.
    ///
    /// # Errors
    /// * `DecodeError::UnexpectedLength` - Reply length does not match the family
    /// * `DecodeError::ChecksumMismatch` - Reply corrupted in transit
    /// * `DecodeError::UnexpectedAddress` - Reply from another board
    /// * `DecodeError::DeviceNack` - Board rejected the command
    /// * `DecodeError::UnexpectedByte` - Acknowledgement byte not recognised
    pub fn decode_reply(&self, reply: &[u8]) -> Result<StatusResponse, DecodeError> {
        let payload = status::check_envelope(reply, self.family)?;
        if reply[0] != self.device_address() {
            return Err(DecodeError::UnexpectedAddress {
                expected: self.device_address(),
                found: reply[0],
            });
        }
        status::decode_payload(payload, self.family)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
