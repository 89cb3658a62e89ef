//! Command codec
//!
//! This module maps relay operations to wire frames and device replies back to
//! typed responses. It performs no I/O.
//!
//! # Command Categories
//! - Relay commands: on, off and toggle of a single relay
//! - Bank commands: whole-bank writes and bank-wide on/off/invert/reverse
//! - Timed commands: one-shot timers and flashers, in board ticks
//! - Queries: relay and bank status, stored power-up state
//! - Device commands: communication test, identification, reporting and refresh
//!   modes
//! - E3C commands: selecting which boards of a chain listen, device numbers
//!
//! # Encoding
//! [`Command::encode`] takes the target board's [`OpcodeTable`] and always succeeds:
//! commands hold resolved addresses (see [`crate::resolver`]), so every operand is
//! in range by construction. Every frame's bytes sum to 0 modulo 256.
//!
//! # Decoding
//! [`decode`] checks a reply's fixed length and zero-sum checksum before looking at
//! its payload. Commands and their replies differ in shape, so encoding and
//! decoding are not inverses of each other.
//!
//! # Important Notes
//! - Toggling is a dedicated opcode; the board tracks relay state, not the driver
//! - Tick durations are passed through unconverted
//! - Acknowledgements are only sent while the board is in reporting mode

mod frame;
mod operands;
mod status;

pub use frame::*;
pub use operands::{RelayMask, Ticks};
pub use status::*;

use operands::{
    infallible, BankMaskOperands, BankOperand, FlasherOperands, RelayOperands, TimerOperands,
};

use crate::{
    opcodes::{OpcodeFamily, OpcodeTable},
    BankAddress, RelayAddress, ToByteArray,
};

/// Action applied to a single relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayAction {
    On,
    Off,
    /// Invert the relay's current state on the board
    Toggle,
}

/// Bank-wide operations without operands beyond the bank itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BankOperation {
    /// Energize all 8 relays
    AllOn,
    /// Release all 8 relays
    AllOff,
    /// Invert every relay
    Invert,
    /// Reverse the bit order of the bank (relay 0 swaps with relay 7, ...)
    Reverse,
    /// Store the current state as the state restored at power-up
    StorePowerUpDefaults,
}

/// Board-level operations without operands
///
/// All of these are acknowledged like relay commands, i.e. only in reporting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceOperation {
    /// Acknowledge every command
    EnableReporting,
    /// Stop acknowledging commands, for one-way links
    DisableReporting,
    /// Apply relay changes immediately
    EnableAutoRefresh,
    /// Hold relay changes until [`DeviceOperation::RefreshRelays`]
    DisableAutoRefresh,
    /// Store the current refresh mode as power-up default
    StoreRefreshMode,
    /// Apply held relay changes
    RefreshRelays,
    /// Make every board of the chain listen
    EnableAllDevices,
    /// Make every board of the chain ignore commands
    DisableAllDevices,
    /// Make the addressed board listen
    EnableSelectedDevice,
    /// Make the addressed board ignore commands
    DisableSelectedDevice,
    /// Make only the addressed board listen
    EnableSelectedDeviceExclusive,
    /// Make every board but the addressed one listen
    DisableSelectedDeviceExclusive,
    /// Store the device number in non-volatile memory
    StoreDeviceNumber,
}

/// A single request to one board
///
/// Commands are plain values: built per call, encoded, then dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Turn one relay on, off, or toggle it
    SetRelay {
        relay: RelayAddress,
        action: RelayAction,
    },
    /// Write all 8 relays of a bank at once
    SetBank { bank: BankAddress, mask: RelayMask },
    /// Switch a relay now and back after `duration`
    ///
    /// The relay rests on after expiry when `on_after_expiry` is set, off otherwise.
    StartTimer {
        relay: RelayAddress,
        duration: Ticks,
        on_after_expiry: bool,
    },
    /// Cycle a relay on for `on_ticks`, off for `off_ticks`
    StartFlasher {
        relay: RelayAddress,
        on_ticks: u8,
        off_ticks: u8,
    },
    /// Read the state of one relay
    QueryRelayStatus { relay: RelayAddress },
    /// Read the relay states of a bank
    QueryStatus { bank: BankAddress },
    /// Apply a bank-wide operation
    BankOperation {
        bank: BankAddress,
        operation: BankOperation,
    },
    /// Read the stored power-up state of a bank
    QueryPowerUpDefaults { bank: BankAddress },
    /// Ask a board to report back, checking two-way communication
    TestComms { device_address: u8 },
    /// Read device id, firmware version and firmware year
    RecallIdentification { device_address: u8 },
    /// Apply a board-level operation
    DeviceOperation {
        device_address: u8,
        operation: DeviceOperation,
    },
    /// Read whether relay outputs refresh automatically
    QueryRefreshMode { device_address: u8 },
    /// Read the stored E3C device number
    RecallDeviceNumber { device_address: u8 },
}

impl Command {
    /// Opcode family used on the wire
    pub fn family(&self) -> OpcodeFamily {
        match self {
            Self::SetRelay { action, .. } => match action {
                RelayAction::On => OpcodeFamily::SetRelayOn,
                RelayAction::Off => OpcodeFamily::SetRelayOff,
                RelayAction::Toggle => OpcodeFamily::ToggleRelay,
            },
            Self::SetBank { .. } => OpcodeFamily::SetBankMask,
            Self::StartTimer { .. } => OpcodeFamily::StartTimer,
            Self::StartFlasher { .. } => OpcodeFamily::StartFlasher,
            Self::QueryRelayStatus { .. } => OpcodeFamily::QueryRelayStatus,
            Self::QueryStatus { .. } => OpcodeFamily::QueryBankStatus,
            Self::BankOperation { operation, .. } => match operation {
                BankOperation::AllOn => OpcodeFamily::BankAllOn,
                BankOperation::AllOff => OpcodeFamily::BankAllOff,
                BankOperation::Invert => OpcodeFamily::InvertBank,
                BankOperation::Reverse => OpcodeFamily::ReverseBank,
                BankOperation::StorePowerUpDefaults => OpcodeFamily::StorePowerUpDefaults,
            },
            Self::QueryPowerUpDefaults { .. } => OpcodeFamily::QueryPowerUpDefaults,
            Self::TestComms { .. } => OpcodeFamily::TestComms,
            Self::RecallIdentification { .. } => OpcodeFamily::RecallIdentification,
            Self::DeviceOperation { operation, .. } => match operation {
                DeviceOperation::EnableReporting => OpcodeFamily::EnableReporting,
                DeviceOperation::DisableReporting => OpcodeFamily::DisableReporting,
                DeviceOperation::EnableAutoRefresh => OpcodeFamily::EnableAutoRefresh,
                DeviceOperation::DisableAutoRefresh => OpcodeFamily::DisableAutoRefresh,
                DeviceOperation::StoreRefreshMode => OpcodeFamily::StoreRefreshMode,
                DeviceOperation::RefreshRelays => OpcodeFamily::RefreshRelays,
                DeviceOperation::EnableAllDevices => OpcodeFamily::EnableAllDevices,
                DeviceOperation::DisableAllDevices => OpcodeFamily::DisableAllDevices,
                DeviceOperation::EnableSelectedDevice => OpcodeFamily::EnableSelectedDevice,
                DeviceOperation::DisableSelectedDevice => OpcodeFamily::DisableSelectedDevice,
                DeviceOperation::EnableSelectedDeviceExclusive => {
                    OpcodeFamily::EnableSelectedDeviceExclusive
                }
                DeviceOperation::DisableSelectedDeviceExclusive => {
                    OpcodeFamily::DisableSelectedDeviceExclusive
                }
                DeviceOperation::StoreDeviceNumber => OpcodeFamily::StoreDeviceNumber,
            },
            Self::QueryRefreshMode { .. } => OpcodeFamily::QueryRefreshMode,
            Self::RecallDeviceNumber { .. } => OpcodeFamily::RecallDeviceNumber,
        }
    }

    /// Device address of the target board
    pub fn device_address(&self) -> u8 {
        match self {
            Self::SetRelay { relay, .. }
            | Self::StartTimer { relay, .. }
            | Self::StartFlasher { relay, .. }
            | Self::QueryRelayStatus { relay } => relay.device_address(),
            Self::SetBank { bank, .. }
            | Self::QueryStatus { bank }
            | Self::BankOperation { bank, .. }
            | Self::QueryPowerUpDefaults { bank } => bank.device_address(),
            Self::TestComms { device_address }
            | Self::RecallIdentification { device_address }
            | Self::DeviceOperation { device_address, .. }
            | Self::QueryRefreshMode { device_address }
            | Self::RecallDeviceNumber { device_address } => *device_address,
        }
    }

    /// Bank the command acts on, for relay and bank commands
    pub fn bank_address(&self) -> Option<BankAddress> {
        match self {
            Self::SetRelay { relay, .. }
            | Self::StartTimer { relay, .. }
            | Self::StartFlasher { relay, .. }
            | Self::QueryRelayStatus { relay } => Some(relay.bank_address()),
            Self::SetBank { bank, .. }
            | Self::QueryStatus { bank }
            | Self::BankOperation { bank, .. }
            | Self::QueryPowerUpDefaults { bank } => Some(*bank),
            Self::TestComms { .. }
            | Self::RecallIdentification { .. }
            | Self::DeviceOperation { .. }
            | Self::QueryRefreshMode { .. }
            | Self::RecallDeviceNumber { .. } => None,
        }
    }

    /// Encodes the command into a frame using the target board's opcode table
    pub fn encode(&self, opcodes: &OpcodeTable) -> Frame {
        let family = self.family();
        let seal = |operands: &[u8]| {
            Frame::seal(
                family,
                self.device_address(),
                opcodes.opcode(family),
                operands,
            )
        };

        match *self {
            Self::SetRelay { relay, .. } | Self::QueryRelayStatus { relay } => seal(&infallible(
                RelayOperands {
                    bank: relay.bank(),
                    bit: relay.bit(),
                }
                .to_bytes(),
            )),
            Self::SetBank { bank, mask } => seal(&infallible(
                BankMaskOperands {
                    mask,
                    bank: bank.bank(),
                }
                .to_bytes(),
            )),
            Self::StartTimer {
                relay,
                duration,
                on_after_expiry,
            } => seal(&infallible(
                TimerOperands {
                    bank: relay.bank(),
                    bit: relay.bit(),
                    on_after_expiry,
                    duration,
                }
                .to_bytes(),
            )),
            Self::StartFlasher {
                relay,
                on_ticks,
                off_ticks,
            } => seal(&infallible(
                FlasherOperands {
                    bank: relay.bank(),
                    bit: relay.bit(),
                    on_ticks,
                    off_ticks,
                }
                .to_bytes(),
            )),
            Self::QueryStatus { bank }
            | Self::BankOperation { bank, .. }
            | Self::QueryPowerUpDefaults { bank } => {
                seal(&infallible(BankOperand { bank: bank.bank() }.to_bytes()))
            }
            Self::TestComms { .. }
            | Self::RecallIdentification { .. }
            | Self::DeviceOperation { .. }
            | Self::QueryRefreshMode { .. }
            | Self::RecallDeviceNumber { .. } => seal(&[]),
        }
    }
}

/// Encodes a command for a board using `opcodes`
///
/// Free-function form of [`Command::encode`].
pub fn encode(command: &Command, opcodes: &OpcodeTable) -> Frame {
    command.encode(opcodes)
}
