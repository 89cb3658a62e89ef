//! Command operands
//!
//! Byte layouts of the parameters that follow the opcode in a frame. Every operand
//! has a fixed width, so frame lengths never depend on operand values.

use bitflags::bitflags;
use core::convert::Infallible;

use crate::ToByteArray;

bitflags! {
    /// Relay states of one bank
    ///
    /// Bit *n* corresponds to relay *n* of the bank; a set bit means energized.
    /// This is the byte written by bank-set commands and returned by bank queries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RelayMask: u8 {
        const RELAY_0 = 1;
        const RELAY_1 = 1 << 1;
        const RELAY_2 = 1 << 2;
        const RELAY_3 = 1 << 3;
        const RELAY_4 = 1 << 4;
        const RELAY_5 = 1 << 5;
        const RELAY_6 = 1 << 6;
        const RELAY_7 = 1 << 7;
    }
}

impl RelayMask {
    /// Mask with only the given relay set, or `None` if `bit` is not in `0..=7`
    pub const fn relay(bit: u8) -> Option<Self> {
        if bit < 8 {
            Some(Self::from_bits_retain(1 << bit))
        } else {
            None
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RelayMask {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "RelayMask({=u8:#b})", self.bits())
    }
}

impl ToByteArray for RelayMask {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.bits()])
    }
}

/// Timer duration in board ticks
///
/// A tick is defined by the board firmware, not by wall-clock time; conversion
/// from seconds is left to the caller. Sent big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ticks(pub u16);

impl ToByteArray for Ticks {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.0.to_be_bytes())
    }
}

/// Bank and relay operands of the per-relay commands and the relay status query
#[derive(Debug, Clone, Copy)]
pub(crate) struct RelayOperands {
    pub bank: u8,
    pub bit: u8,
}

impl ToByteArray for RelayOperands {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.bank, self.bit])
    }
}

/// Operands of the bank-set command
///
/// # Layout
/// - Byte 0: Relay mask
/// - Byte 1: Bank
#[derive(Debug, Clone, Copy)]
pub(crate) struct BankMaskOperands {
    pub mask: RelayMask,
    pub bank: u8,
}

impl ToByteArray for BankMaskOperands {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let [mask] = infallible(self.mask.to_bytes());
        Ok([mask, self.bank])
    }
}

/// Timer operands
///
/// # Layout
/// - Byte 0: Bank
/// - Byte 1 bits 2:0: Relay
/// - Byte 1 bit 7: Relay state once the timer expires (1 = on)
/// - Bytes 2-3: Duration in ticks, big-endian
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimerOperands {
    pub bank: u8,
    pub bit: u8,
    pub on_after_expiry: bool,
    pub duration: Ticks,
}

impl ToByteArray for TimerOperands {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let [hi, lo] = infallible(self.duration.to_bytes());
        Ok([
            self.bank,
            (self.bit & 0x07) | ((self.on_after_expiry as u8) << 7),
            hi,
            lo,
        ])
    }
}

/// Flasher operands: bank, relay, on ticks, off ticks
#[derive(Debug, Clone, Copy)]
pub(crate) struct FlasherOperands {
    pub bank: u8,
    pub bit: u8,
    pub on_ticks: u8,
    pub off_ticks: u8,
}

impl ToByteArray for FlasherOperands {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.bank, self.bit, self.on_ticks, self.off_ticks])
    }
}

/// Bank operand of queries and bank-wide commands
#[derive(Debug, Clone, Copy)]
pub(crate) struct BankOperand {
    pub bank: u8,
}

impl ToByteArray for BankOperand {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.bank])
    }
}

pub(crate) fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}
