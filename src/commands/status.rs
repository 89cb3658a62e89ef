//! Device replies
//!
//! # Reply Format
//! - Byte 0: Device address of the replying board
//! - Byte 1: Check byte, chosen by the board so the reply sums to 0 modulo 256
//! - Bytes 2..: Payload, fixed width per [`ReplyKind`]
//!
//! Acknowledgement payloads are [`ACK`] or [`NACK`]. Bank payloads are a
//! [`RelayMask`]. Relay status and refresh mode payloads are a single 0 or 1.
//! Identification payloads are four bytes: device id (little-endian), firmware
//! version and production year.

use crate::{
    opcodes::{OpcodeFamily, ReplyKind, ACK, NACK, REPLY_HEADER_LEN},
    DecodeError, FromByteArray, RelayMask,
};

use super::{frame::is_zero_sum, operands::infallible};

/// Acknowledgement payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Acknowledgement;

impl FromByteArray for Acknowledgement {
    type Error = DecodeError;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        match bytes[0] {
            ACK => Ok(Self),
            NACK => Err(DecodeError::DeviceNack),
            other => Err(DecodeError::UnexpectedByte(other)),
        }
    }
}

/// Single relay state payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RelayState(bool);

impl FromByteArray for RelayState {
    type Error = DecodeError;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        match bytes[0] {
            0 => Ok(Self(false)),
            1 => Ok(Self(true)),
            other => Err(DecodeError::UnexpectedByte(other)),
        }
    }
}

/// How relay outputs follow state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefreshMode {
    /// Outputs change only on an explicit refresh
    Manual,
    /// Outputs change as soon as a command executes (board default)
    Automatic,
}

impl FromByteArray for RefreshMode {
    type Error = DecodeError;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        match bytes[0] {
            0 => Ok(Self::Manual),
            1 => Ok(Self::Automatic),
            other => Err(DecodeError::UnexpectedByte(other)),
        }
    }
}

impl FromByteArray for RelayMask {
    type Error = core::convert::Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self::from_bits_retain(bytes[0]))
    }
}

/// Board identification
///
/// Reported by the recall identification command. Current ProXR boards report
/// device id 1 and firmware 17 or newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceIdentification {
    /// ProXR device id
    pub device_id: u16,
    /// Firmware version
    pub firmware_version: u8,
    /// Year of firmware production
    pub firmware_year: u16,
}

impl FromByteArray for DeviceIdentification {
    type Error = core::convert::Infallible;
    type Array = [u8; 4];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        // Year is sent as century digit + two-digit year: 205 = 2005
        let year = bytes[3] as u16;
        Ok(Self {
            device_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            firmware_version: bytes[2],
            firmware_year: (year / 100) * 1000 + year % 100,
        })
    }
}

/// Decoded device reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusResponse {
    /// Command completed
    Ack,
    /// Relay states of the queried bank
    BankState {
        /// One bit per relay, set = energized
        mask: RelayMask,
    },
    /// State of the queried relay
    RelayState {
        /// Whether the relay is energized
        on: bool,
    },
    /// Refresh mode of the board
    RefreshMode(RefreshMode),
    /// Stored E3C device number
    DeviceNumber(u8),
    /// Board identification
    Identification(DeviceIdentification),
}

impl StatusResponse {
    /// The bank mask, for bank replies
    pub fn mask(&self) -> Option<RelayMask> {
        match self {
            Self::BankState { mask } => Some(*mask),
            _ => None,
        }
    }
}

/// Decodes a device reply to a command of the given family
///
/// The reply must have the family's fixed length and sum to zero. A checksum failure
/// means the reply was corrupted in transit and is reported before the payload is
/// looked at; a NACK is the board's own rejection of an intact command.
///
/// # Errors
/// * `DecodeError::UnexpectedLength` - Reply length does not match the family
/// * `DecodeError::ChecksumMismatch` - Reply corrupted in transit
/// * `DecodeError::DeviceNack` - Board rejected the command
/// * `DecodeError::UnexpectedByte` - Acknowledgement or state byte not recognised
pub fn decode(bytes: &[u8], family: OpcodeFamily) -> Result<StatusResponse, DecodeError> {
    let payload = check_envelope(bytes, family)?;
    decode_payload(payload, family)
}

/// Validates length and checksum, returning the payload
pub(crate) fn check_envelope(bytes: &[u8], family: OpcodeFamily) -> Result<&[u8], DecodeError> {
    let expected = family.reply_len();
    if bytes.len() != expected {
        return Err(DecodeError::UnexpectedLength {
            expected,
            found: bytes.len(),
        });
    }
    if !is_zero_sum(bytes) {
        return Err(DecodeError::ChecksumMismatch);
    }
    Ok(&bytes[REPLY_HEADER_LEN..])
}

pub(crate) fn decode_payload(
    payload: &[u8],
    family: OpcodeFamily,
) -> Result<StatusResponse, DecodeError> {
    match family.reply_kind() {
        ReplyKind::Ack => {
            Acknowledgement::from_bytes(array(payload)?)?;
            Ok(StatusResponse::Ack)
        }
        ReplyKind::BankState => {
            let mask = infallible(RelayMask::from_bytes(array(payload)?));
            Ok(StatusResponse::BankState { mask })
        }
        ReplyKind::RelayState => {
            let RelayState(on) = RelayState::from_bytes(array(payload)?)?;
            Ok(StatusResponse::RelayState { on })
        }
        ReplyKind::RefreshMode => Ok(StatusResponse::RefreshMode(RefreshMode::from_bytes(
            array(payload)?,
        )?)),
        ReplyKind::DeviceNumber => {
            let [number] = array(payload)?;
            Ok(StatusResponse::DeviceNumber(number))
        }
        ReplyKind::Identification => {
            let identification = infallible(DeviceIdentification::from_bytes(array(payload)?));
            Ok(StatusResponse::Identification(identification))
        }
    }
}

fn array<const N: usize>(payload: &[u8]) -> Result<[u8; N], DecodeError> {
    payload
        .try_into()
        .map_err(|_| DecodeError::UnexpectedLength {
            expected: REPLY_HEADER_LEN + N,
            found: REPLY_HEADER_LEN + payload.len(),
        })
}
