//! Relay addressing
//!
//! Converts caller-facing relay references into validated board/bank/relay
//! addresses. Everything here is a pure function of its inputs and the
//! [`BoardTopology`]; nothing is cached between calls.

use crate::{AddressError, BoardTopology, RelayMask, RELAYS_PER_BANK};

/// Caller-facing reference to a single relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayRef {
    /// Explicit board, bank and relay
    Relay {
        /// Device address of the board
        device_address: u8,
        /// Bank index on the board
        bank: u8,
        /// Relay index in the bank, `0..=7`
        bit: u8,
    },
    /// Flat index counting every relay of the topology in board, bank, relay order
    Global(u32),
}

impl RelayRef {
    pub const fn new(device_address: u8, bank: u8, bit: u8) -> Self {
        Self::Relay {
            device_address,
            bank,
            bit,
        }
    }

    pub const fn global(index: u32) -> Self {
        Self::Global(index)
    }
}

/// Validated address of one bank
///
/// Only produced by resolution against a topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BankAddress {
    device_address: u8,
    bank: u8,
}

impl BankAddress {
    pub const fn device_address(&self) -> u8 {
        self.device_address
    }

    pub const fn bank(&self) -> u8 {
        self.bank
    }
}

/// Validated address of one relay
///
/// Only produced by resolution against a topology, so the relay index is always in
/// `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RelayAddress {
    bank: BankAddress,
    bit: u8,
}

impl RelayAddress {
    pub const fn device_address(&self) -> u8 {
        self.bank.device_address
    }

    pub const fn bank(&self) -> u8 {
        self.bank.bank
    }

    pub const fn bit(&self) -> u8 {
        self.bit
    }

    /// The bank this relay belongs to
    pub const fn bank_address(&self) -> BankAddress {
        self.bank
    }

    /// Mask with only this relay set
    pub const fn mask(&self) -> RelayMask {
        RelayMask::from_bits_retain(1 << self.bit)
    }
}

/// Resolves a relay reference against a topology
///
/// # Errors
/// * `AddressError::UnknownBoard` - Device address not in the topology
/// * `AddressError::BankOutOfRange` - Bank index beyond the board's bank count
/// * `AddressError::BitOutOfRange` - Relay index not in `0..=7`
/// * `AddressError::IndexOutOfRange` - Flat index beyond the topology's relay count
///
/// Explicit references are checked board first, then bank, then relay; only the
/// first failing check is reported.
pub fn resolve<const N: usize>(
    relay: RelayRef,
    topology: &BoardTopology<N>,
) -> Result<RelayAddress, AddressError> {
    match relay {
        RelayRef::Relay {
            device_address,
            bank,
            bit,
        } => {
            let bank = resolve_bank(device_address, bank, topology)?;
            if bit >= RELAYS_PER_BANK {
                return Err(AddressError::BitOutOfRange(bit));
            }
            Ok(RelayAddress { bank, bit })
        }
        RelayRef::Global(index) => {
            let mut remaining = index;
            for board in topology.boards() {
                if remaining < board.relay_count() {
                    let per_bank = RELAYS_PER_BANK as u32;
                    return Ok(RelayAddress {
                        bank: BankAddress {
                            device_address: board.address(),
                            bank: (remaining / per_bank) as u8,
                        },
                        bit: (remaining % per_bank) as u8,
                    });
                }
                remaining -= board.relay_count();
            }
            Err(AddressError::IndexOutOfRange {
                index,
                relay_count: topology.relay_count(),
            })
        }
    }
}

/// Resolves a bank against a topology
///
/// # Errors
/// * `AddressError::UnknownBoard` - Device address not in the topology
/// * `AddressError::BankOutOfRange` - Bank index beyond the board's bank count
pub fn resolve_bank<const N: usize>(
    device_address: u8,
    bank: u8,
    topology: &BoardTopology<N>,
) -> Result<BankAddress, AddressError> {
    let board = topology
        .board(device_address)
        .ok_or(AddressError::UnknownBoard(device_address))?;
    if bank >= board.banks() {
        return Err(AddressError::BankOutOfRange {
            device_address,
            bank,
            bank_count: board.banks(),
        });
    }
    Ok(BankAddress {
        device_address,
        bank,
    })
}

impl<const N: usize> BoardTopology<N> {
    /// See [`resolve`]
    pub fn resolve(&self, relay: RelayRef) -> Result<RelayAddress, AddressError> {
        resolve(relay, self)
    }

    /// See [`resolve_bank`]
    pub fn resolve_bank(&self, device_address: u8, bank: u8) -> Result<BankAddress, AddressError> {
        resolve_bank(device_address, bank, self)
    }
}

/// Partial or complete update of one bank
///
/// Relays in `on` are energized, relays in `off` released. Relays in neither mask
/// keep their state from `previous`, a snapshot the caller obtained (typically from
/// a bank status query right before). The snapshot is never cached by the driver;
/// boards change state behind its back on power cycles and external commands.
///
/// ```
/// use proxr::{BankUpdate, RelayMask};
///
/// let update = BankUpdate::new(RelayMask::from_bits_retain(0b101), RelayMask::RELAY_1)
///     .with_previous(RelayMask::RELAY_7);
/// assert_eq!(update.resolve().unwrap().bits(), 0b1000_0101);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BankUpdate {
    pub on: RelayMask,
    pub off: RelayMask,
    pub previous: Option<RelayMask>,
}

impl BankUpdate {
    pub const fn new(on: RelayMask, off: RelayMask) -> Self {
        Self {
            on,
            off,
            previous: None,
        }
    }

    /// Update that sets every relay of the bank to `mask`
    pub const fn exact(mask: RelayMask) -> Self {
        Self::new(mask, mask.complement())
    }

    /// Supplies the current bank state for relays in neither mask
    pub const fn with_previous(mut self, previous: RelayMask) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Folds the update into the mask to write
    ///
    /// # Errors
    /// * `AddressError::OverlappingMasks` - A relay is in both `on` and `off`
    /// * `AddressError::MissingSnapshot` - Some relays are in neither mask and no
    ///   `previous` state was supplied
    pub fn resolve(&self) -> Result<RelayMask, AddressError> {
        let overlap = self.on & self.off;
        if !overlap.is_empty() {
            return Err(AddressError::OverlappingMasks(overlap.bits()));
        }
        match self.previous {
            Some(previous) => Ok((previous - self.off) | self.on),
            None if (self.on | self.off).is_all() => Ok(self.on),
            None => Err(AddressError::MissingSnapshot),
        }
    }
}
