//! Opcode tables
//!
//! ProXR firmware generations disagree on the command byte used for several
//! operations. Rather than modelling each generation as its own type, every board in
//! a [`BoardTopology`](crate::BoardTopology) carries an [`OpcodeTable`], normally
//! taken from its [`BoardRevision`] and optionally overridden field by field.
//!
//! The wire layout of each [`OpcodeFamily`] (operand count, reply shape) is fixed
//! and does not depend on the table.

use core::time::Duration;

/// Acknowledgement byte reported after a command completes (ASCII 'U', decimal 85)
pub const ACK: u8 = 0x55;

/// Rejection byte reported when the firmware refuses a command
pub const NACK: u8 = 0xAA;

/// Length of the reply header: echoed device address and check byte
pub const REPLY_HEADER_LEN: usize = 2;

/// Longest reply any opcode family produces
pub const MAX_REPLY_LEN: usize = REPLY_HEADER_LEN + 4;

/// Command families understood by ProXR boards
///
/// Each family has a fixed frame length and a fixed reply shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpcodeFamily {
    /// Turn one relay on (operands: bank, relay)
    SetRelayOn,
    /// Turn one relay off (operands: bank, relay)
    SetRelayOff,
    /// Invert one relay (operands: bank, relay)
    ToggleRelay,
    /// Write a whole bank (operands: mask, bank)
    SetBankMask,
    /// Arm a one-shot relay timer (operands: bank, relay | rest state, ticks hi, ticks lo)
    StartTimer,
    /// Arm a relay flasher (operands: bank, relay, on ticks, off ticks)
    StartFlasher,
    /// Read one relay's state (operands: bank, relay)
    QueryRelayStatus,
    /// Read a bank's relay states (operands: bank)
    QueryBankStatus,
    /// Turn every relay in a bank on (operands: bank)
    BankAllOn,
    /// Turn every relay in a bank off (operands: bank)
    BankAllOff,
    /// Invert every relay in a bank (operands: bank)
    InvertBank,
    /// Reverse the relay order of a bank (operands: bank)
    ReverseBank,
    /// Store a bank's current state as its power-up state (operands: bank)
    StorePowerUpDefaults,
    /// Read a bank's stored power-up state (operands: bank)
    QueryPowerUpDefaults,
    /// Two-way communication check (no operands)
    TestComms,
    /// Read device id, firmware version and year (no operands)
    RecallIdentification,
    /// Acknowledge every command from now on (no operands)
    EnableReporting,
    /// Stop acknowledging commands (no operands)
    DisableReporting,
    /// Refresh relay outputs on every state change (no operands)
    EnableAutoRefresh,
    /// Hold relay output changes until an explicit refresh (no operands)
    DisableAutoRefresh,
    /// Store the refresh mode as power-up default (no operands)
    StoreRefreshMode,
    /// Read the refresh mode (no operands)
    QueryRefreshMode,
    /// Apply pending relay changes (no operands)
    RefreshRelays,
    /// Make every device of the chain listen (no operands)
    EnableAllDevices,
    /// Make every device of the chain ignore commands (no operands)
    DisableAllDevices,
    /// Make the addressed device listen (no operands)
    EnableSelectedDevice,
    /// Make the addressed device ignore commands (no operands)
    DisableSelectedDevice,
    /// Make only the addressed device listen (no operands)
    EnableSelectedDeviceExclusive,
    /// Make every device except the addressed one listen (no operands)
    DisableSelectedDeviceExclusive,
    /// Store the device number in non-volatile memory (no operands)
    StoreDeviceNumber,
    /// Read the stored device number (no operands)
    RecallDeviceNumber,
}

/// Shape of the reply a family produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplyKind {
    /// Single ACK/NACK byte, only sent while reporting mode is on
    Ack,
    /// Single relay mask byte, always sent
    BankState,
    /// Single relay state byte (0 = off, 1 = on), always sent
    RelayState,
    /// Single refresh mode byte (0 = manual, 1 = automatic), always sent
    RefreshMode,
    /// Single device number byte, always sent
    DeviceNumber,
    /// Four identification bytes, always sent
    Identification,
}

impl ReplyKind {
    /// Number of payload bytes following the reply header
    pub const fn payload_len(self) -> usize {
        match self {
            Self::Identification => 4,
            Self::Ack
            | Self::BankState
            | Self::RelayState
            | Self::RefreshMode
            | Self::DeviceNumber => 1,
        }
    }
}

impl OpcodeFamily {
    /// Every family, in declaration order
    pub const ALL: [Self; 31] = [
        Self::SetRelayOn,
        Self::SetRelayOff,
        Self::ToggleRelay,
        Self::SetBankMask,
        Self::StartTimer,
        Self::StartFlasher,
        Self::QueryRelayStatus,
        Self::QueryBankStatus,
        Self::BankAllOn,
        Self::BankAllOff,
        Self::InvertBank,
        Self::ReverseBank,
        Self::StorePowerUpDefaults,
        Self::QueryPowerUpDefaults,
        Self::TestComms,
        Self::RecallIdentification,
        Self::EnableReporting,
        Self::DisableReporting,
        Self::EnableAutoRefresh,
        Self::DisableAutoRefresh,
        Self::StoreRefreshMode,
        Self::QueryRefreshMode,
        Self::RefreshRelays,
        Self::EnableAllDevices,
        Self::DisableAllDevices,
        Self::EnableSelectedDevice,
        Self::DisableSelectedDevice,
        Self::EnableSelectedDeviceExclusive,
        Self::DisableSelectedDeviceExclusive,
        Self::StoreDeviceNumber,
        Self::RecallDeviceNumber,
    ];

    /// Number of operand bytes between the opcode and the checksum
    pub const fn operand_len(self) -> usize {
        match self {
            Self::SetRelayOn
            | Self::SetRelayOff
            | Self::ToggleRelay
            | Self::SetBankMask
            | Self::QueryRelayStatus => 2,
            Self::StartTimer | Self::StartFlasher => 4,
            Self::QueryBankStatus
            | Self::BankAllOn
            | Self::BankAllOff
            | Self::InvertBank
            | Self::ReverseBank
            | Self::StorePowerUpDefaults
            | Self::QueryPowerUpDefaults => 1,
            Self::TestComms
            | Self::RecallIdentification
            | Self::EnableReporting
            | Self::DisableReporting
            | Self::EnableAutoRefresh
            | Self::DisableAutoRefresh
            | Self::StoreRefreshMode
            | Self::QueryRefreshMode
            | Self::RefreshRelays
            | Self::EnableAllDevices
            | Self::DisableAllDevices
            | Self::EnableSelectedDevice
            | Self::DisableSelectedDevice
            | Self::EnableSelectedDeviceExclusive
            | Self::DisableSelectedDeviceExclusive
            | Self::StoreDeviceNumber
            | Self::RecallDeviceNumber => 0,
        }
    }

    /// Full frame length: device address, opcode, operands and checksum
    pub const fn frame_len(self) -> usize {
        2 + self.operand_len() + 1
    }

    /// Shape of the device's reply
    pub const fn reply_kind(self) -> ReplyKind {
        match self {
            Self::QueryBankStatus | Self::QueryPowerUpDefaults => ReplyKind::BankState,
            Self::QueryRelayStatus => ReplyKind::RelayState,
            Self::QueryRefreshMode => ReplyKind::RefreshMode,
            Self::RecallDeviceNumber => ReplyKind::DeviceNumber,
            Self::RecallIdentification => ReplyKind::Identification,
            _ => ReplyKind::Ack,
        }
    }

    /// Full reply length including the header
    pub const fn reply_len(self) -> usize {
        REPLY_HEADER_LEN + self.reply_kind().payload_len()
    }

    /// Whether a reply must be read after sending this family
    ///
    /// Queries always answer. Acknowledgements are only sent in reporting mode,
    /// except for [`OpcodeFamily::TestComms`] whose only purpose is the reply.
    /// Reporting mode changes are acknowledged according to the mode in effect
    /// before the command.
    pub const fn expects_reply(self, reporting: bool) -> bool {
        match self {
            Self::TestComms => true,
            _ => match self.reply_kind() {
                ReplyKind::Ack => reporting,
                ReplyKind::BankState
                | ReplyKind::RelayState
                | ReplyKind::RefreshMode
                | ReplyKind::DeviceNumber
                | ReplyKind::Identification => true,
            },
        }
    }
}

/// Opcode byte for every [`OpcodeFamily`]
///
/// Fields are public so a board with unusual firmware can override single entries:
///
/// ```
/// use proxr::OpcodeTable;
///
/// let table = OpcodeTable {
///     start_timer: 0x3C,
///     ..OpcodeTable::PROXR
/// };
/// assert_eq!(table.set_relay_on, OpcodeTable::PROXR.set_relay_on);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OpcodeTable {
    pub set_relay_on: u8,
    pub set_relay_off: u8,
    pub toggle_relay: u8,
    pub set_bank_mask: u8,
    pub start_timer: u8,
    pub start_flasher: u8,
    pub query_relay_status: u8,
    pub query_bank_status: u8,
    pub bank_all_on: u8,
    pub bank_all_off: u8,
    pub invert_bank: u8,
    pub reverse_bank: u8,
    pub store_power_up_defaults: u8,
    pub query_power_up_defaults: u8,
    pub test_comms: u8,
    pub recall_identification: u8,
    pub enable_reporting: u8,
    pub disable_reporting: u8,
    pub enable_auto_refresh: u8,
    pub disable_auto_refresh: u8,
    pub store_refresh_mode: u8,
    pub query_refresh_mode: u8,
    pub refresh_relays: u8,
    pub enable_all_devices: u8,
    pub disable_all_devices: u8,
    pub enable_selected_device: u8,
    pub disable_selected_device: u8,
    pub enable_selected_device_exclusive: u8,
    pub disable_selected_device_exclusive: u8,
    pub store_device_number: u8,
    pub recall_device_number: u8,
}

impl OpcodeTable {
    /// Command set of current ProXR firmware (bank-addressed commands, 100+ range)
    ///
    /// Per-relay opcodes are the base of their ranges (off 100..=107, on 108..=115,
    /// status 116..=123); the relay itself travels as an operand.
    pub const PROXR: Self = Self {
        set_relay_on: 108,
        set_relay_off: 100,
        toggle_relay: 133,
        set_bank_mask: 140,
        start_timer: 50,
        start_flasher: 60,
        query_relay_status: 116,
        query_bank_status: 124,
        bank_all_on: 129,
        bank_all_off: 130,
        invert_bank: 131,
        reverse_bank: 132,
        store_power_up_defaults: 142,
        query_power_up_defaults: 143,
        test_comms: 33,
        recall_identification: 246,
        enable_reporting: 27,
        disable_reporting: 28,
        enable_auto_refresh: 25,
        disable_auto_refresh: 26,
        store_refresh_mode: 35,
        query_refresh_mode: 36,
        refresh_relays: 37,
        enable_all_devices: 248,
        disable_all_devices: 249,
        enable_selected_device: 250,
        disable_selected_device: 251,
        enable_selected_device_exclusive: 252,
        disable_selected_device_exclusive: 253,
        store_device_number: 255,
        recall_device_number: 247,
    };

    /// Command set of early ProXR firmware
    ///
    /// Timers, flashers and relay toggling live on different bytes; the rest
    /// matches [`OpcodeTable::PROXR`].
    pub const PROXR_LEGACY: Self = Self {
        toggle_relay: 134,
        start_timer: 70,
        start_flasher: 80,
        ..Self::PROXR
    };

    /// Opcode byte for a family
    pub const fn opcode(&self, family: OpcodeFamily) -> u8 {
        match family {
            OpcodeFamily::SetRelayOn => self.set_relay_on,
            OpcodeFamily::SetRelayOff => self.set_relay_off,
            OpcodeFamily::ToggleRelay => self.toggle_relay,
            OpcodeFamily::SetBankMask => self.set_bank_mask,
            OpcodeFamily::StartTimer => self.start_timer,
            OpcodeFamily::StartFlasher => self.start_flasher,
            OpcodeFamily::QueryRelayStatus => self.query_relay_status,
            OpcodeFamily::QueryBankStatus => self.query_bank_status,
            OpcodeFamily::BankAllOn => self.bank_all_on,
            OpcodeFamily::BankAllOff => self.bank_all_off,
            OpcodeFamily::InvertBank => self.invert_bank,
            OpcodeFamily::ReverseBank => self.reverse_bank,
            OpcodeFamily::StorePowerUpDefaults => self.store_power_up_defaults,
            OpcodeFamily::QueryPowerUpDefaults => self.query_power_up_defaults,
            OpcodeFamily::TestComms => self.test_comms,
            OpcodeFamily::RecallIdentification => self.recall_identification,
            OpcodeFamily::EnableReporting => self.enable_reporting,
            OpcodeFamily::DisableReporting => self.disable_reporting,
            OpcodeFamily::EnableAutoRefresh => self.enable_auto_refresh,
            OpcodeFamily::DisableAutoRefresh => self.disable_auto_refresh,
            OpcodeFamily::StoreRefreshMode => self.store_refresh_mode,
            OpcodeFamily::QueryRefreshMode => self.query_refresh_mode,
            OpcodeFamily::RefreshRelays => self.refresh_relays,
            OpcodeFamily::EnableAllDevices => self.enable_all_devices,
            OpcodeFamily::DisableAllDevices => self.disable_all_devices,
            OpcodeFamily::EnableSelectedDevice => self.enable_selected_device,
            OpcodeFamily::DisableSelectedDevice => self.disable_selected_device,
            OpcodeFamily::EnableSelectedDeviceExclusive => self.enable_selected_device_exclusive,
            OpcodeFamily::DisableSelectedDeviceExclusive => {
                self.disable_selected_device_exclusive
            }
            OpcodeFamily::StoreDeviceNumber => self.store_device_number,
            OpcodeFamily::RecallDeviceNumber => self.recall_device_number,
        }
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::PROXR
    }
}

/// ProXR board generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoardRevision {
    /// Current firmware
    #[default]
    ProXr,
    /// Early firmware; drops commands sent back to back
    ProXrLegacy,
}

impl BoardRevision {
    /// Default opcode table for this revision
    pub const fn opcodes(self) -> OpcodeTable {
        match self {
            Self::ProXr => OpcodeTable::PROXR,
            Self::ProXrLegacy => OpcodeTable::PROXR_LEGACY,
        }
    }

    /// Minimum recommended gap between consecutive commands
    ///
    /// Commands arriving faster than this may be dropped silently by the firmware.
    /// The driver does not wait on its own; callers pace writes, e.g. in a wrapper
    /// around [`RelayController`](crate::RelayController).
    pub const fn min_command_interval(self) -> Duration {
        match self {
            Self::ProXr => Duration::from_millis(20),
            Self::ProXrLegacy => Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_lengths_are_fixed_per_family() {
        assert_eq!(OpcodeFamily::SetRelayOn.frame_len(), 5);
        assert_eq!(OpcodeFamily::SetBankMask.frame_len(), 5);
        assert_eq!(OpcodeFamily::StartTimer.frame_len(), 7);
        assert_eq!(OpcodeFamily::StartFlasher.frame_len(), 7);
        assert_eq!(OpcodeFamily::QueryBankStatus.frame_len(), 4);
        assert_eq!(OpcodeFamily::TestComms.frame_len(), 3);
    }

    #[test]
    fn replies_depend_on_reporting_mode_only_for_acks() {
        assert!(OpcodeFamily::SetRelayOn.expects_reply(true));
        assert!(!OpcodeFamily::SetRelayOn.expects_reply(false));
        assert!(OpcodeFamily::QueryBankStatus.expects_reply(false));
        assert!(OpcodeFamily::TestComms.expects_reply(false));
        assert_eq!(OpcodeFamily::RecallIdentification.reply_len(), MAX_REPLY_LEN);
    }

    #[test]
    fn legacy_table_differs_only_where_documented() {
        let legacy = BoardRevision::ProXrLegacy.opcodes();
        assert_ne!(legacy.start_timer, OpcodeTable::PROXR.start_timer);
        assert_eq!(legacy.set_bank_mask, OpcodeTable::PROXR.set_bank_mask);
        assert_eq!(legacy.opcode(OpcodeFamily::ToggleRelay), 134);
        assert!(
            BoardRevision::ProXrLegacy.min_command_interval()
                > BoardRevision::ProXr.min_command_interval()
        );
    }

    #[test]
    fn built_in_tables_assign_one_byte_per_family() {
        for table in [OpcodeTable::PROXR, OpcodeTable::PROXR_LEGACY] {
            for (i, a) in OpcodeFamily::ALL.iter().enumerate() {
                for b in &OpcodeFamily::ALL[i + 1..] {
                    assert_ne!(table.opcode(*a), table.opcode(*b), "{a:?} and {b:?}");
                }
            }
        }
    }

    #[test]
    fn only_relay_indexed_families_use_the_indexed_ranges() {
        // Index-addressed (0..=23) and bank-addressed (100..=123) per-relay ranges
        let indexed = |opcode: u8| opcode <= 23 || (100..=123).contains(&opcode);
        let bases = [
            OpcodeFamily::SetRelayOn,
            OpcodeFamily::SetRelayOff,
            OpcodeFamily::QueryRelayStatus,
        ];

        for table in [OpcodeTable::PROXR, OpcodeTable::PROXR_LEGACY] {
            for family in OpcodeFamily::ALL {
                if !bases.contains(&family) {
                    assert!(!indexed(table.opcode(family)), "{family:?}");
                }
            }
            assert!(!(116..=123).contains(&table.toggle_relay));
        }
    }

    #[test]
    fn queries_always_answer() {
        for family in [
            OpcodeFamily::QueryRelayStatus,
            OpcodeFamily::QueryRefreshMode,
            OpcodeFamily::RecallDeviceNumber,
        ] {
            assert!(family.expects_reply(false), "{family:?}");
            assert_eq!(family.reply_len(), REPLY_HEADER_LEN + 1);
        }
        assert!(!OpcodeFamily::DisableReporting.expects_reply(false));
        assert!(OpcodeFamily::DisableReporting.expects_reply(true));
    }
}
