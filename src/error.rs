//! Error types
//!
//! Every failure is scoped to a single call and returned to the caller; nothing is
//! retried or swallowed inside the driver.
//!
//! - [`AddressError`]: caller input rejected before any byte is written
//! - [`TopologyError`]: invalid chain description at construction time
//! - [`DecodeError`]: corrupted, malformed or rejected device replies
//! - [`TransportError`]: the caller's transport failed
//! - [`Error`]: union of the per-call kinds returned by the controller, plus the
//!   refusal of write-only dispatch to send commands that are answered

use core::fmt;

use crate::OpcodeFamily;

/// Error type for relay and bank addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressError {
    /// No board with this device address exists in the topology
    UnknownBoard(u8),
    /// The bank index exceeds the board's bank count
    BankOutOfRange {
        /// Device address of the board
        device_address: u8,
        /// Requested bank index
        bank: u8,
        /// Number of banks the board carries
        bank_count: u8,
    },
    /// The relay index within a bank is not in `0..=7`
    BitOutOfRange(u8),
    /// A flat relay index exceeds the total relay count of the topology
    IndexOutOfRange {
        /// Requested global index
        index: u32,
        /// Number of relays in the topology
        relay_count: u32,
    },
    /// The same relays were requested both on and off
    OverlappingMasks(u8),
    /// A partial bank update was requested without a snapshot of the bank state
    MissingSnapshot,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownBoard(address) => write!(f, "no board at device address {address:#04x}"),
            Self::BankOutOfRange {
                device_address,
                bank,
                bank_count,
            } => write!(
                f,
                "bank {bank} out of range for board {device_address:#04x} ({bank_count} banks)"
            ),
            Self::BitOutOfRange(bit) => write!(f, "relay {bit} out of range, expected 0..=7"),
            Self::IndexOutOfRange { index, relay_count } => {
                write!(f, "relay index {index} out of range ({relay_count} relays)")
            }
            Self::OverlappingMasks(overlap) => {
                write!(f, "relays {overlap:#010b} requested both on and off")
            }
            Self::MissingSnapshot => f.write_str("partial bank update requires a bank snapshot"),
        }
    }
}

impl core::error::Error for AddressError {}

/// Error type for board topology construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TopologyError {
    /// The topology contains no boards
    Empty,
    /// Two boards share the same device address
    DuplicateAddress(u8),
    /// The board at this device address declares zero banks
    NoBanks(u8),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("topology contains no boards"),
            Self::DuplicateAddress(address) => {
                write!(f, "device address {address:#04x} used more than once")
            }
            Self::NoBanks(address) => write!(f, "board {address:#04x} declares no relay banks"),
        }
    }
}

impl core::error::Error for TopologyError {}

/// Error type for device reply decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The reply bytes do not sum to zero; the reply was corrupted in transit
    ChecksumMismatch,
    /// The reply length does not match the fixed length for the command
    UnexpectedLength {
        /// Length required for the command
        expected: usize,
        /// Length received
        found: usize,
    },
    /// The device rejected the command
    DeviceNack,
    /// The reply came from a different device address than the command targeted
    UnexpectedAddress {
        /// Device address of the command
        expected: u8,
        /// Device address echoed in the reply
        found: u8,
    },
    /// The acknowledgement byte is neither ACK nor NACK
    UnexpectedByte(u8),
    /// The reply kind does not match the operation that was issued
    UnexpectedReply,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumMismatch => f.write_str("reply checksum mismatch"),
            Self::UnexpectedLength { expected, found } => {
                write!(f, "reply of {found} bytes, expected {expected}")
            }
            Self::DeviceNack => f.write_str("device rejected the command"),
            Self::UnexpectedAddress { expected, found } => {
                write!(f, "reply from device {found:#04x}, expected {expected:#04x}")
            }
            Self::UnexpectedByte(byte) => write!(f, "unexpected acknowledgement byte {byte:#04x}"),
            Self::UnexpectedReply => f.write_str("reply kind does not match the command"),
        }
    }
}

impl core::error::Error for DecodeError {}

/// Error type wrapping failures of the caller's transport
///
/// The wrapped error is passed through unchanged and never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError<E> {
    /// Writing or flushing the frame failed
    Write(E),
    /// Reading the reply failed
    Read(E),
    /// The transport reached end of stream before the full reply arrived
    UnexpectedEof,
}

impl<E> From<embedded_io::ReadExactError<E>> for TransportError<E> {
    fn from(error: embedded_io::ReadExactError<E>) -> Self {
        match error {
            embedded_io::ReadExactError::UnexpectedEof => Self::UnexpectedEof,
            embedded_io::ReadExactError::Other(e) => Self::Read(e),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for TransportError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write(e) => write!(f, "transport write failed: {e:?}"),
            Self::Read(e) => write!(f, "transport read failed: {e:?}"),
            Self::UnexpectedEof => f.write_str("transport closed before the reply was complete"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for TransportError<E> {}

/// Error type returned by [`RelayController`](crate::RelayController) operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Caller input rejected; nothing was sent
    Address(AddressError),
    /// The device reply was corrupted or rejected the command
    Decode(DecodeError),
    /// The transport failed
    Transport(TransportError<E>),
    /// A write-only dispatch was asked to send a command the board answers;
    /// nothing was sent
    ReplyRequired(OpcodeFamily),
}

impl<E> From<AddressError> for Error<E> {
    fn from(error: AddressError) -> Self {
        Self::Address(error)
    }
}

impl<E> From<DecodeError> for Error<E> {
    fn from(error: DecodeError) -> Self {
        Self::Decode(error)
    }
}

impl<E> From<TransportError<E>> for Error<E> {
    fn from(error: TransportError<E>) -> Self {
        Self::Transport(error)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(e) => write!(f, "addressing error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
            Self::Transport(e) => write!(f, "{e}"),
            Self::ReplyRequired(family) => {
                write!(f, "{family:?} is answered by the board and needs a readable transport")
            }
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}
