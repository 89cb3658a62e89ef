#![cfg_attr(not(test), no_std)]
//! ProXR Relay Controller Driver
//!
//! This crate provides a type-safe interface for NCD ProXR-family relay controller
//! boards. The boards are driven over any byte-oriented channel (TCP bridge, RS-232,
//! USB serial) that the caller has already opened and configured; this crate never
//! opens, configures or closes that channel.
//!
//! # Features
//! - Daisy-chained boards addressed by a 1-byte device address
//! - Up to 255 relay banks per board, 8 relays per bank
//! - Individual relay on/off/toggle, whole-bank writes, timers and flashers
//! - Relay status, bank status and power-up default queries
//! - Reporting mode, relay refresh mode and E3C device selection
//! - Checksummed frames and replies, with explicit NACK detection
//! - Per-board opcode tables for differing firmware generations
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`controller`]: Main controller interface for hardware interaction
//!   - Provides high-level relay operations
//!   - Writes frames to the transport and validates replies
//!
//! - [`commands`]: Command codec
//!   - [`Command`]: Every operation the boards understand
//!   - [`Frame`]: Checksummed wire frame
//!   - [`StatusResponse`]: Decoded device replies
//!
//! - [`resolver`]: Relay addressing against the configured [`BoardTopology`]
//!
//! - [`topology`] and [`opcodes`]: Chain layout and firmware opcode tables
//!
//! # Usage
//! The transport is anything implementing the `embedded-io` traits (or the
//! `embedded-io-async` traits for the `_async` operations). The main entry point is
//! the [`RelayController`] struct which owns the transport together with the
//! [`BoardTopology`] describing the chain.
//!
//! # Important Notes
//! - The controller is stateless. Relay state lives on the board only; partial bank
//!   updates take an explicit snapshot (see [`BankUpdate`]).
//! - Nothing is retried. Every failure is returned to the caller.
//! - Older boards may silently drop commands that arrive too quickly. The minimum
//!   spacing is published per revision by [`BoardRevision::min_command_interval`]
//!   and must be honoured by the caller.
//!
//! # Example
//! ```no_run
//! use proxr::{Board, BoardTopology, Error, RelayController, RelayRef};
//!
//! fn pulse<T>(transport: T) -> Result<T, Error<T::Error>>
//! where
//!     T: embedded_io::Read + embedded_io::Write,
//! {
//!     let topology = BoardTopology::new([Board::new(0x01, 2)]).unwrap();
//!     let mut controller = RelayController::new(transport, topology);
//!
//!     controller.turn_on(RelayRef::new(0x01, 0, 3))?;
//!     let mask = controller.query_bank_status(0x01, 0)?;
//!     assert!(mask.contains(proxr::RelayMask::RELAY_3));
//!
//!     Ok(controller.release())
//! }
//! ```

use regiface::{FromByteArray, ToByteArray};

pub mod commands;
pub mod controller;
pub mod error;
pub mod opcodes;
pub mod resolver;
pub mod topology;

pub use commands::*;
pub use controller::{RelayController, Reporting};
pub use error::*;
pub use opcodes::*;
pub use resolver::*;
pub use topology::*;
