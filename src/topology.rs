//! Board topology
//!
//! A ProXR chain is one or more boards sharing a single transport, each answering to
//! its own device address. The chain is described once by the caller and never
//! discovered at runtime; re-addressing boards means building a new [`BoardTopology`].

use crate::{BoardRevision, OpcodeTable, TopologyError};

/// Number of relays in one bank
pub const RELAYS_PER_BANK: u8 = 8;

/// One board of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Board {
    address: u8,
    banks: u8,
    revision: BoardRevision,
    opcodes: OpcodeTable,
}

impl Board {
    /// Current-revision board with the given device address and bank count
    pub const fn new(address: u8, banks: u8) -> Self {
        Self {
            address,
            banks,
            revision: BoardRevision::ProXr,
            opcodes: OpcodeTable::PROXR,
        }
    }

    /// Sets the firmware revision and its default opcode table
    pub const fn with_revision(mut self, revision: BoardRevision) -> Self {
        self.revision = revision;
        self.opcodes = revision.opcodes();
        self
    }

    /// Overrides the opcode table, keeping the revision
    pub const fn with_opcodes(mut self, opcodes: OpcodeTable) -> Self {
        self.opcodes = opcodes;
        self
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    pub const fn banks(&self) -> u8 {
        self.banks
    }

    pub const fn revision(&self) -> BoardRevision {
        self.revision
    }

    pub const fn opcodes(&self) -> &OpcodeTable {
        &self.opcodes
    }

    /// Total relays on this board
    pub const fn relay_count(&self) -> u32 {
        self.banks as u32 * RELAYS_PER_BANK as u32
    }
}

/// Validated, immutable description of a board chain
///
/// Boards keep the order they were given in; flat relay indices count through them
/// in that order.
///
/// ```
/// use proxr::{Board, BoardRevision, BoardTopology, TopologyError};
///
/// let topology = BoardTopology::new([
///     Board::new(0x01, 2),
///     Board::new(0x02, 4).with_revision(BoardRevision::ProXrLegacy),
/// ])
/// .unwrap();
/// assert_eq!(topology.relay_count(), 48);
///
/// let duplicate = BoardTopology::new([Board::new(0x01, 1), Board::new(0x01, 1)]);
/// assert_eq!(duplicate.unwrap_err(), TopologyError::DuplicateAddress(0x01));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardTopology<const N: usize> {
    boards: [Board; N],
}

impl<const N: usize> BoardTopology<N> {
    /// Validates and wraps a chain of boards
    ///
    /// # Errors
    /// * `TopologyError::Empty` - No boards given
    /// * `TopologyError::NoBanks` - A board declares zero banks
    /// * `TopologyError::DuplicateAddress` - Two boards share a device address
    pub fn new(boards: [Board; N]) -> Result<Self, TopologyError> {
        if N == 0 {
            return Err(TopologyError::Empty);
        }
        for (i, board) in boards.iter().enumerate() {
            if board.banks == 0 {
                return Err(TopologyError::NoBanks(board.address));
            }
            if boards[..i].iter().any(|other| other.address == board.address) {
                return Err(TopologyError::DuplicateAddress(board.address));
            }
        }
        Ok(Self { boards })
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    /// Looks up a board by device address
    pub fn board(&self, address: u8) -> Option<&Board> {
        self.boards.iter().find(|board| board.address == address)
    }

    /// Total relays across all boards
    pub fn relay_count(&self) -> u32 {
        self.boards.iter().map(Board::relay_count).sum()
    }
}
