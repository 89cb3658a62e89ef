//! ProXR Relay Controller Interface
//!
//! This module provides a high-level interface for driving a chain of ProXR boards
//! through a caller-supplied byte transport. It supports both blocking operation
//! through the `embedded-io` traits and asynchronous operation through
//! `embedded-io-async`.
//!
//! The interface is built around the `RelayController<T, N>` struct which owns the
//! transport and the [`BoardTopology`] and provides methods for:
//! - Switching single relays, timers and flashers
//! - Writing and querying whole banks
//! - Checking communication and identifying boards
//! - Reporting and refresh modes, E3C device selection
//!
//! Each call resolves addressing, encodes one frame, writes it, and reads the
//! board's reply when one is due. Calls are independent: the controller keeps no
//! relay state and never reorders, batches or retries writes.
//!
//! # Pacing
//! Some boards drop commands that follow each other too closely. The controller
//! does not sleep between calls; callers honour
//! [`BoardRevision::min_command_interval`](crate::BoardRevision::min_command_interval)
//! themselves.
//!
//! # One-way links
//! Operations that may read a reply need `Read + Write`. On a write-only transport,
//! disable reporting and issue commands with
//! [`dispatch`](RelayController::dispatch), which refuses any command the board
//! would answer instead of leaving the answer unread.
//!
//! # Sharing
//! The transport is the only shared resource. Callers issuing commands from several
//! threads wrap the controller in their own lock.
//!
//! # Example
//! ```no_run
//! use proxr::{Board, BoardTopology, BankUpdate, RelayController, RelayMask, RelayRef};
//!
//! # fn run<T: embedded_io::Read + embedded_io::Write>(transport: T) -> Result<(), proxr::Error<T::Error>> {
//! let topology = BoardTopology::new([Board::new(0x01, 2)]).unwrap();
//! let mut controller = RelayController::new(transport, topology);
//!
//! controller.toggle(RelayRef::new(0x01, 1, 4))?;
//!
//! // Partial bank update against a fresh snapshot
//! let current = controller.query_bank_status(0x01, 0)?;
//! let update = BankUpdate::new(RelayMask::RELAY_0, RelayMask::RELAY_1).with_previous(current);
//! controller.set_bank(0x01, 0, update)?;
//! # Ok(())
//! # }
//! ```

use crate::{
    opcodes::{OpcodeFamily, MAX_REPLY_LEN},
    AddressError, BankAddress, BankOperation, BankUpdate, BoardTopology, Command, DecodeError,
    DeviceIdentification, DeviceOperation, Error, Frame, RefreshMode, RelayAction, RelayMask,
    RelayRef, StatusResponse, Ticks, TransportError,
};

/// Whether boards acknowledge every command
///
/// ProXR boards default to reporting mode: each command is answered with an
/// acknowledgement byte once it has executed. Boards on one-way links have reporting
/// turned off and only answer queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reporting {
    #[default]
    Enabled,
    Disabled,
}

/// Main controller interface for a ProXR board chain.
///
/// This struct owns the transport and the chain topology. Blocking operations need
/// `T: embedded_io::Read + embedded_io::Write`; their `_async` counterparts need the
/// `embedded_io_async` equivalents. [`dispatch`](RelayController::dispatch) only
/// needs the write half.
pub struct RelayController<T, const N: usize> {
    transport: T,
    topology: BoardTopology<N>,
    reporting: Reporting,
}

impl<T, const N: usize> RelayController<T, N> {
    /// Creates a controller for boards in reporting mode.
    ///
    /// # Arguments
    /// * `transport` - An open byte channel to the first board of the chain
    /// * `topology` - The boards reachable through the channel
    pub fn new(transport: T, topology: BoardTopology<N>) -> Self {
        Self {
            transport,
            topology,
            reporting: Reporting::Enabled,
        }
    }

    /// Sets whether boards acknowledge commands.
    ///
    /// This only tells the controller which mode the boards are in; use
    /// [`set_reporting`](RelayController::set_reporting) to change a board's mode.
    pub fn with_reporting(mut self, reporting: Reporting) -> Self {
        self.reporting = reporting;
        self
    }

    pub fn topology(&self) -> &BoardTopology<N> {
        &self.topology
    }

    pub fn reporting(&self) -> Reporting {
        self.reporting
    }

    /// Releases the underlying transport.
    pub fn release(self) -> T {
        self.transport
    }

    /// Encodes a command with its board's opcode table.
    ///
    /// The command's board and bank are checked against this controller's topology,
    /// so addresses resolved against another topology cannot reach the wire.
    ///
    /// # Errors
    /// * `AddressError::UnknownBoard` - The command targets a board missing from the topology
    /// * `AddressError::BankOutOfRange` - The bank does not exist on that board
    pub fn encode(&self, command: &Command) -> Result<Frame, AddressError> {
        let device_address = command.device_address();
        let board = self
            .topology
            .board(device_address)
            .ok_or(AddressError::UnknownBoard(device_address))?;
        if let Some(bank) = command.bank_address() {
            if bank.bank() >= board.banks() {
                return Err(AddressError::BankOutOfRange {
                    device_address,
                    bank: bank.bank(),
                    bank_count: board.banks(),
                });
            }
        }
        Ok(command.encode(board.opcodes()))
    }

    fn expects_reply(&self, frame: &Frame) -> bool {
        frame
            .family()
            .expects_reply(self.reporting == Reporting::Enabled)
    }

    /// Follows reporting mode changes the boards have accepted
    fn track_reporting(&mut self, frame: &Frame) {
        match frame.family() {
            OpcodeFamily::EnableReporting => self.reporting = Reporting::Enabled,
            OpcodeFamily::DisableReporting => self.reporting = Reporting::Disabled,
            _ => {}
        }
    }

    fn relay_command(
        &self,
        relay: RelayRef,
        action: RelayAction,
    ) -> Result<Command, AddressError> {
        Ok(Command::SetRelay {
            relay: self.topology.resolve(relay)?,
            action,
        })
    }

    fn bank(&self, device_address: u8, bank: u8) -> Result<BankAddress, AddressError> {
        self.topology.resolve_bank(device_address, bank)
    }

    fn board(&self, device_address: u8) -> Result<u8, AddressError> {
        self.topology
            .board(device_address)
            .map(|board| board.address())
            .ok_or(AddressError::UnknownBoard(device_address))
    }

    fn set_bank_command(
        &self,
        device_address: u8,
        bank: u8,
        update: BankUpdate,
    ) -> Result<Command, AddressError> {
        Ok(Command::SetBank {
            bank: self.bank(device_address, bank)?,
            mask: update.resolve()?,
        })
    }

    fn timer_command(
        &self,
        relay: RelayRef,
        duration: Ticks,
        on_after_expiry: bool,
    ) -> Result<Command, AddressError> {
        Ok(Command::StartTimer {
            relay: self.topology.resolve(relay)?,
            duration,
            on_after_expiry,
        })
    }

    fn flasher_command(
        &self,
        relay: RelayRef,
        on_ticks: u8,
        off_ticks: u8,
    ) -> Result<Command, AddressError> {
        Ok(Command::StartFlasher {
            relay: self.topology.resolve(relay)?,
            on_ticks,
            off_ticks,
        })
    }

    fn device_command(
        &self,
        device_address: u8,
        operation: DeviceOperation,
    ) -> Result<Command, AddressError> {
        Ok(Command::DeviceOperation {
            device_address: self.board(device_address)?,
            operation,
        })
    }
}

fn expect_mask(response: Option<StatusResponse>) -> Result<RelayMask, DecodeError> {
    response
        .and_then(|response| response.mask())
        .ok_or(DecodeError::UnexpectedReply)
}

fn expect_relay_state(response: Option<StatusResponse>) -> Result<bool, DecodeError> {
    match response {
        Some(StatusResponse::RelayState { on }) => Ok(on),
        _ => Err(DecodeError::UnexpectedReply),
    }
}

fn expect_refresh_mode(response: Option<StatusResponse>) -> Result<RefreshMode, DecodeError> {
    match response {
        Some(StatusResponse::RefreshMode(mode)) => Ok(mode),
        _ => Err(DecodeError::UnexpectedReply),
    }
}

fn expect_device_number(response: Option<StatusResponse>) -> Result<u8, DecodeError> {
    match response {
        Some(StatusResponse::DeviceNumber(number)) => Ok(number),
        _ => Err(DecodeError::UnexpectedReply),
    }
}

fn expect_identification(
    response: Option<StatusResponse>,
) -> Result<DeviceIdentification, DecodeError> {
    match response {
        Some(StatusResponse::Identification(identification)) => Ok(identification),
        _ => Err(DecodeError::UnexpectedReply),
    }
}

fn reporting_operation(reporting: Reporting) -> DeviceOperation {
    match reporting {
        Reporting::Enabled => DeviceOperation::EnableReporting,
        Reporting::Disabled => DeviceOperation::DisableReporting,
    }
}

fn log_reply(frame: &Frame, reply: &[u8], decoded: &Result<StatusResponse, DecodeError>) {
    #[cfg(feature = "defmt")]
    match decoded {
        Ok(_) => defmt::trace!("proxr rx {=[u8]:#x}", reply),
        Err(e) => defmt::debug!(
            "proxr reply {=[u8]:#x} to {=[u8]:#x} rejected: {}",
            reply,
            frame.as_bytes(),
            e
        ),
    }
    #[cfg(not(feature = "defmt"))]
    let _ = (frame, reply, decoded);
}

impl<T, const N: usize> RelayController<T, N>
where
    T: embedded_io::Write,
{
    fn send(&mut self, frame: &Frame) -> Result<(), Error<T::Error>> {
        #[cfg(feature = "defmt")]
        defmt::trace!("proxr tx {=[u8]:#x}", frame.as_bytes());

        self.transport
            .write_all(frame.as_bytes())
            .map_err(TransportError::Write)?;
        self.transport.flush().map_err(TransportError::Write)?;
        Ok(())
    }

    /// Sends a command that the board will not answer.
    ///
    /// Only needs the write half of the transport, for one-way links. With
    /// reporting enabled every command is answered, so only use this with
    /// [`Reporting::Disabled`].
    ///
    /// ```no_run
    /// use proxr::{Board, BoardTopology, Command, RelayAction, RelayController, RelayRef, Reporting};
    ///
    /// # fn run<W: embedded_io::Write>(link: W) -> Result<(), proxr::Error<W::Error>> {
    /// let topology = BoardTopology::new([Board::new(0x01, 1)]).unwrap();
    /// let mut controller = RelayController::new(link, topology).with_reporting(Reporting::Disabled);
    ///
    /// let relay = controller.topology().resolve(RelayRef::new(0x01, 0, 2))?;
    /// controller.dispatch(Command::SetRelay { relay, action: RelayAction::On })?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// * `Error::Address` - Unknown board or bank; nothing was sent
    /// * `Error::ReplyRequired` - The board answers this command in the current
    ///   reporting mode; nothing was sent
    /// * `Error::Transport` - Writing failed
    pub fn dispatch(&mut self, command: Command) -> Result<(), Error<T::Error>> {
        let frame = self.encode(&command)?;
        if self.expects_reply(&frame) {
            return Err(Error::ReplyRequired(frame.family()));
        }
        self.send(&frame)?;
        self.track_reporting(&frame);
        Ok(())
    }
}

impl<T, const N: usize> RelayController<T, N>
where
    T: embedded_io::Read + embedded_io::Write,
{
    /// Executes a command on its board.
    ///
    /// Writes the encoded frame, then reads and decodes the reply if the board sends
    /// one for this command in the current reporting mode.
    ///
    /// # Returns
    /// The decoded reply, or `None` when no reply is due
    ///
    /// # Errors
    /// * `Error::Address` - The command targets a board or bank missing from the topology
    /// * `Error::Transport` - Writing or reading failed
    /// * `Error::Decode` - The reply was corrupted, malformed or a NACK
    pub fn execute(&mut self, command: Command) -> Result<Option<StatusResponse>, Error<T::Error>> {
        let frame = self.encode(&command)?;
        self.send(&frame)?;
        if !self.expects_reply(&frame) {
            self.track_reporting(&frame);
            return Ok(None);
        }

        let mut buffer = [0u8; MAX_REPLY_LEN];
        let len = frame.reply_len();
        self.transport
            .read_exact(&mut buffer[..len])
            .map_err(TransportError::<T::Error>::from)?;
        let reply = &buffer[..len];

        let decoded = frame.decode_reply(reply);
        log_reply(&frame, reply, &decoded);
        let response = decoded?;
        self.track_reporting(&frame);
        Ok(Some(response))
    }

    /// Turns a relay on.
    pub fn turn_on(&mut self, relay: RelayRef) -> Result<(), Error<T::Error>> {
        let command = self.relay_command(relay, RelayAction::On)?;
        self.execute(command).map(drop)
    }

    /// Turns a relay off.
    pub fn turn_off(&mut self, relay: RelayRef) -> Result<(), Error<T::Error>> {
        let command = self.relay_command(relay, RelayAction::Off)?;
        self.execute(command).map(drop)
    }

    /// Inverts a relay.
    ///
    /// The board inverts its own state; nothing is read beforehand.
    pub fn toggle(&mut self, relay: RelayRef) -> Result<(), Error<T::Error>> {
        let command = self.relay_command(relay, RelayAction::Toggle)?;
        self.execute(command).map(drop)
    }

    /// Writes a bank.
    ///
    /// # Arguments
    /// * `update` - Relays to energize and release, plus the bank snapshot used for
    ///   the remaining relays
    ///
    /// # Errors
    /// * `Error::Address` - Unknown board or bank, overlapping masks, or a partial
    ///   update without a snapshot
    pub fn set_bank(
        &mut self,
        device_address: u8,
        bank: u8,
        update: BankUpdate,
    ) -> Result<(), Error<T::Error>> {
        let command = self.set_bank_command(device_address, bank, update)?;
        self.execute(command).map(drop)
    }

    /// Switches a relay and arms a timer that sets its rest state after `duration`.
    pub fn start_timer(
        &mut self,
        relay: RelayRef,
        duration: Ticks,
        on_after_expiry: bool,
    ) -> Result<(), Error<T::Error>> {
        let command = self.timer_command(relay, duration, on_after_expiry)?;
        self.execute(command).map(drop)
    }

    /// Starts flashing a relay.
    pub fn start_flasher(
        &mut self,
        relay: RelayRef,
        on_ticks: u8,
        off_ticks: u8,
    ) -> Result<(), Error<T::Error>> {
        let command = self.flasher_command(relay, on_ticks, off_ticks)?;
        self.execute(command).map(drop)
    }

    /// Reads whether a relay is energized.
    pub fn query_relay_status(&mut self, relay: RelayRef) -> Result<bool, Error<T::Error>> {
        let relay = self.topology.resolve(relay)?;
        let response = self.execute(Command::QueryRelayStatus { relay })?;
        Ok(expect_relay_state(response)?)
    }

    /// Reads the relay states of a bank.
    pub fn query_bank_status(
        &mut self,
        device_address: u8,
        bank: u8,
    ) -> Result<RelayMask, Error<T::Error>> {
        let bank = self.bank(device_address, bank)?;
        let response = self.execute(Command::QueryStatus { bank })?;
        Ok(expect_mask(response)?)
    }

    /// Applies a bank-wide operation.
    pub fn bank_operation(
        &mut self,
        device_address: u8,
        bank: u8,
        operation: BankOperation,
    ) -> Result<(), Error<T::Error>> {
        let bank = self.bank(device_address, bank)?;
        self.execute(Command::BankOperation { bank, operation })
            .map(drop)
    }

    /// Energizes every relay of a bank.
    pub fn all_on(&mut self, device_address: u8, bank: u8) -> Result<(), Error<T::Error>> {
        self.bank_operation(device_address, bank, BankOperation::AllOn)
    }

    /// Releases every relay of a bank.
    pub fn all_off(&mut self, device_address: u8, bank: u8) -> Result<(), Error<T::Error>> {
        self.bank_operation(device_address, bank, BankOperation::AllOff)
    }

    /// Inverts every relay of a bank.
    pub fn invert_bank(&mut self, device_address: u8, bank: u8) -> Result<(), Error<T::Error>> {
        self.bank_operation(device_address, bank, BankOperation::Invert)
    }

    /// Reverses the relay order of a bank.
    pub fn reverse_bank(&mut self, device_address: u8, bank: u8) -> Result<(), Error<T::Error>> {
        self.bank_operation(device_address, bank, BankOperation::Reverse)
    }

    /// Stores a bank's current state as its power-up state.
    pub fn store_power_up_defaults(
        &mut self,
        device_address: u8,
        bank: u8,
    ) -> Result<(), Error<T::Error>> {
        self.bank_operation(device_address, bank, BankOperation::StorePowerUpDefaults)
    }

    /// Reads a bank's stored power-up state.
    pub fn query_power_up_defaults(
        &mut self,
        device_address: u8,
        bank: u8,
    ) -> Result<RelayMask, Error<T::Error>> {
        let bank = self.bank(device_address, bank)?;
        let response = self.execute(Command::QueryPowerUpDefaults { bank })?;
        Ok(expect_mask(response)?)
    }

    /// Checks two-way communication with a board.
    ///
    /// Succeeds when the board answers with an acknowledgement, regardless of
    /// reporting mode.
    pub fn test_comms(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        let device_address = self.board(device_address)?;
        self.execute(Command::TestComms { device_address })
            .map(drop)
    }

    /// Reads a board's identification.
    pub fn identify(&mut self, device_address: u8) -> Result<DeviceIdentification, Error<T::Error>> {
        let device_address = self.board(device_address)?;
        let response = self.execute(Command::RecallIdentification { device_address })?;
        Ok(expect_identification(response)?)
    }

    /// Applies a board-level operation.
    ///
    /// Reporting mode changes are tracked by the controller once the board has
    /// accepted them.
    pub fn device_operation(
        &mut self,
        device_address: u8,
        operation: DeviceOperation,
    ) -> Result<(), Error<T::Error>> {
        let command = self.device_command(device_address, operation)?;
        self.execute(command).map(drop)
    }

    /// Switches a board's reporting mode and follows it.
    ///
    /// The controller keeps one mode for the whole chain, so every board of the
    /// chain must be switched before talking to the others again. The command is
    /// acknowledged according to the mode in effect before it.
    pub fn set_reporting(
        &mut self,
        device_address: u8,
        reporting: Reporting,
    ) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, reporting_operation(reporting))
    }

    /// Makes relay changes take effect as soon as they execute.
    pub fn enable_auto_refresh(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, DeviceOperation::EnableAutoRefresh)
    }

    /// Holds relay changes until [`refresh_relays`](RelayController::refresh_relays).
    pub fn disable_auto_refresh(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, DeviceOperation::DisableAutoRefresh)
    }

    /// Stores the current refresh mode as the power-up default.
    pub fn store_refresh_mode(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, DeviceOperation::StoreRefreshMode)
    }

    /// Applies held relay changes.
    pub fn refresh_relays(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, DeviceOperation::RefreshRelays)
    }

    /// Reads a board's refresh mode.
    pub fn query_refresh_mode(&mut self, device_address: u8) -> Result<RefreshMode, Error<T::Error>> {
        let device_address = self.board(device_address)?;
        let response = self.execute(Command::QueryRefreshMode { device_address })?;
        Ok(expect_refresh_mode(response)?)
    }

    /// Makes every board of the chain listen to commands.
    pub fn enable_all_devices(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, DeviceOperation::EnableAllDevices)
    }

    /// Makes every board of the chain ignore commands.
    pub fn disable_all_devices(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, DeviceOperation::DisableAllDevices)
    }

    /// Makes a board listen to commands.
    pub fn enable_device(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, DeviceOperation::EnableSelectedDevice)
    }

    /// Makes a board ignore commands.
    pub fn disable_device(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, DeviceOperation::DisableSelectedDevice)
    }

    /// Makes a board the only one listening to commands.
    pub fn enable_device_exclusive(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, DeviceOperation::EnableSelectedDeviceExclusive)
    }

    /// Makes every board but this one listen to commands.
    pub fn disable_device_exclusive(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, DeviceOperation::DisableSelectedDeviceExclusive)
    }

    /// Stores a board's device number in non-volatile memory.
    pub fn store_device_number(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation(device_address, DeviceOperation::StoreDeviceNumber)
    }

    /// Reads a board's stored device number.
    pub fn recall_device_number(&mut self, device_address: u8) -> Result<u8, Error<T::Error>> {
        let device_address = self.board(device_address)?;
        let response = self.execute(Command::RecallDeviceNumber { device_address })?;
        Ok(expect_device_number(response)?)
    }
}

impl<T, const N: usize> RelayController<T, N>
where
    T: embedded_io_async::Write,
{
    async fn send_async(&mut self, frame: &Frame) -> Result<(), Error<T::Error>> {
        #[cfg(feature = "defmt")]
        defmt::trace!("proxr tx {=[u8]:#x}", frame.as_bytes());

        self.transport
            .write_all(frame.as_bytes())
            .await
            .map_err(TransportError::Write)?;
        self.transport
            .flush()
            .await
            .map_err(TransportError::Write)?;
        Ok(())
    }

    /// Asynchronously sends a command that the board will not answer.
    ///
    /// This is the async version of [`dispatch`](RelayController::dispatch).
    pub async fn dispatch_async(&mut self, command: Command) -> Result<(), Error<T::Error>> {
        let frame = self.encode(&command)?;
        if self.expects_reply(&frame) {
            return Err(Error::ReplyRequired(frame.family()));
        }
        self.send_async(&frame).await?;
        self.track_reporting(&frame);
        Ok(())
    }
}

impl<T, const N: usize> RelayController<T, N>
where
    T: embedded_io_async::Read + embedded_io_async::Write,
{
    /// Asynchronously executes a command on its board.
    ///
    /// This is the async version of [`execute`](RelayController::execute).
    pub async fn execute_async(
        &mut self,
        command: Command,
    ) -> Result<Option<StatusResponse>, Error<T::Error>> {
        let frame = self.encode(&command)?;
        self.send_async(&frame).await?;
        if !self.expects_reply(&frame) {
            self.track_reporting(&frame);
            return Ok(None);
        }

        let mut buffer = [0u8; MAX_REPLY_LEN];
        let len = frame.reply_len();
        self.transport
            .read_exact(&mut buffer[..len])
            .await
            .map_err(TransportError::<T::Error>::from)?;
        let reply = &buffer[..len];

        let decoded = frame.decode_reply(reply);
        log_reply(&frame, reply, &decoded);
        let response = decoded?;
        self.track_reporting(&frame);
        Ok(Some(response))
    }

    /// This is the async version of [`turn_on`](RelayController::turn_on).
    pub async fn turn_on_async(&mut self, relay: RelayRef) -> Result<(), Error<T::Error>> {
        let command = self.relay_command(relay, RelayAction::On)?;
        self.execute_async(command).await.map(drop)
    }

    /// This is the async version of [`turn_off`](RelayController::turn_off).
    pub async fn turn_off_async(&mut self, relay: RelayRef) -> Result<(), Error<T::Error>> {
        let command = self.relay_command(relay, RelayAction::Off)?;
        self.execute_async(command).await.map(drop)
    }

    /// This is the async version of [`toggle`](RelayController::toggle).
    pub async fn toggle_async(&mut self, relay: RelayRef) -> Result<(), Error<T::Error>> {
        let command = self.relay_command(relay, RelayAction::Toggle)?;
        self.execute_async(command).await.map(drop)
    }

    /// This is the async version of [`set_bank`](RelayController::set_bank).
    pub async fn set_bank_async(
        &mut self,
        device_address: u8,
        bank: u8,
        update: BankUpdate,
    ) -> Result<(), Error<T::Error>> {
        let command = self.set_bank_command(device_address, bank, update)?;
        self.execute_async(command).await.map(drop)
    }

    /// This is the async version of [`start_timer`](RelayController::start_timer).
    pub async fn start_timer_async(
        &mut self,
        relay: RelayRef,
        duration: Ticks,
        on_after_expiry: bool,
    ) -> Result<(), Error<T::Error>> {
        let command = self.timer_command(relay, duration, on_after_expiry)?;
        self.execute_async(command).await.map(drop)
    }

    /// This is the async version of [`start_flasher`](RelayController::start_flasher).
    pub async fn start_flasher_async(
        &mut self,
        relay: RelayRef,
        on_ticks: u8,
        off_ticks: u8,
    ) -> Result<(), Error<T::Error>> {
        let command = self.flasher_command(relay, on_ticks, off_ticks)?;
        self.execute_async(command).await.map(drop)
    }

    /// This is the async version of [`query_relay_status`](RelayController::query_relay_status).
    pub async fn query_relay_status_async(
        &mut self,
        relay: RelayRef,
    ) -> Result<bool, Error<T::Error>> {
        let relay = self.topology.resolve(relay)?;
        let response = self
            .execute_async(Command::QueryRelayStatus { relay })
            .await?;
        Ok(expect_relay_state(response)?)
    }

    /// This is the async version of [`query_bank_status`](RelayController::query_bank_status).
    pub async fn query_bank_status_async(
        &mut self,
        device_address: u8,
        bank: u8,
    ) -> Result<RelayMask, Error<T::Error>> {
        let bank = self.bank(device_address, bank)?;
        let response = self.execute_async(Command::QueryStatus { bank }).await?;
        Ok(expect_mask(response)?)
    }

    /// This is the async version of [`bank_operation`](RelayController::bank_operation).
    pub async fn bank_operation_async(
        &mut self,
        device_address: u8,
        bank: u8,
        operation: BankOperation,
    ) -> Result<(), Error<T::Error>> {
        let bank = self.bank(device_address, bank)?;
        self.execute_async(Command::BankOperation { bank, operation })
            .await
            .map(drop)
    }

    /// This is the async version of [`all_on`](RelayController::all_on).
    pub async fn all_on_async(&mut self, device_address: u8, bank: u8) -> Result<(), Error<T::Error>> {
        self.bank_operation_async(device_address, bank, BankOperation::AllOn)
            .await
    }

    /// This is the async version of [`all_off`](RelayController::all_off).
    pub async fn all_off_async(&mut self, device_address: u8, bank: u8) -> Result<(), Error<T::Error>> {
        self.bank_operation_async(device_address, bank, BankOperation::AllOff)
            .await
    }

    /// This is the async version of [`invert_bank`](RelayController::invert_bank).
    pub async fn invert_bank_async(
        &mut self,
        device_address: u8,
        bank: u8,
    ) -> Result<(), Error<T::Error>> {
        self.bank_operation_async(device_address, bank, BankOperation::Invert)
            .await
    }

    /// This is the async version of [`reverse_bank`](RelayController::reverse_bank).
    pub async fn reverse_bank_async(
        &mut self,
        device_address: u8,
        bank: u8,
    ) -> Result<(), Error<T::Error>> {
        self.bank_operation_async(device_address, bank, BankOperation::Reverse)
            .await
    }

    /// This is the async version of
    /// [`store_power_up_defaults`](RelayController::store_power_up_defaults).
    pub async fn store_power_up_defaults_async(
        &mut self,
        device_address: u8,
        bank: u8,
    ) -> Result<(), Error<T::Error>> {
        self.bank_operation_async(device_address, bank, BankOperation::StorePowerUpDefaults)
            .await
    }

    /// This is the async version of
    /// [`query_power_up_defaults`](RelayController::query_power_up_defaults).
    pub async fn query_power_up_defaults_async(
        &mut self,
        device_address: u8,
        bank: u8,
    ) -> Result<RelayMask, Error<T::Error>> {
        let bank = self.bank(device_address, bank)?;
        let response = self
            .execute_async(Command::QueryPowerUpDefaults { bank })
            .await?;
        Ok(expect_mask(response)?)
    }

    /// This is the async version of [`test_comms`](RelayController::test_comms).
    pub async fn test_comms_async(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        let device_address = self.board(device_address)?;
        self.execute_async(Command::TestComms { device_address })
            .await
            .map(drop)
    }

    /// This is the async version of [`identify`](RelayController::identify).
    pub async fn identify_async(
        &mut self,
        device_address: u8,
    ) -> Result<DeviceIdentification, Error<T::Error>> {
        let device_address = self.board(device_address)?;
        let response = self
            .execute_async(Command::RecallIdentification { device_address })
            .await?;
        Ok(expect_identification(response)?)
    }

    /// This is the async version of [`device_operation`](RelayController::device_operation).
    pub async fn device_operation_async(
        &mut self,
        device_address: u8,
        operation: DeviceOperation,
    ) -> Result<(), Error<T::Error>> {
        let command = self.device_command(device_address, operation)?;
        self.execute_async(command).await.map(drop)
    }

    /// This is the async version of [`set_reporting`](RelayController::set_reporting).
    pub async fn set_reporting_async(
        &mut self,
        device_address: u8,
        reporting: Reporting,
    ) -> Result<(), Error<T::Error>> {
        self.device_operation_async(device_address, reporting_operation(reporting))
            .await
    }

    /// This is the async version of [`enable_auto_refresh`](RelayController::enable_auto_refresh).
    pub async fn enable_auto_refresh_async(
        &mut self,
        device_address: u8,
    ) -> Result<(), Error<T::Error>> {
        self.device_operation_async(device_address, DeviceOperation::EnableAutoRefresh)
            .await
    }

    /// This is the async version of [`disable_auto_refresh`](RelayController::disable_auto_refresh).
    pub async fn disable_auto_refresh_async(
        &mut self,
        device_address: u8,
    ) -> Result<(), Error<T::Error>> {
        self.device_operation_async(device_address, DeviceOperation::DisableAutoRefresh)
            .await
    }

    /// This is the async version of [`store_refresh_mode`](RelayController::store_refresh_mode).
    pub async fn store_refresh_mode_async(
        &mut self,
        device_address: u8,
    ) -> Result<(), Error<T::Error>> {
        self.device_operation_async(device_address, DeviceOperation::StoreRefreshMode)
            .await
    }

    /// This is the async version of [`refresh_relays`](RelayController::refresh_relays).
    pub async fn refresh_relays_async(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation_async(device_address, DeviceOperation::RefreshRelays)
            .await
    }

    /// This is the async version of [`query_refresh_mode`](RelayController::query_refresh_mode).
    pub async fn query_refresh_mode_async(
        &mut self,
        device_address: u8,
    ) -> Result<RefreshMode, Error<T::Error>> {
        let device_address = self.board(device_address)?;
        let response = self
            .execute_async(Command::QueryRefreshMode { device_address })
            .await?;
        Ok(expect_refresh_mode(response)?)
    }

    /// This is the async version of [`enable_all_devices`](RelayController::enable_all_devices).
    pub async fn enable_all_devices_async(
        &mut self,
        device_address: u8,
    ) -> Result<(), Error<T::Error>> {
        self.device_operation_async(device_address, DeviceOperation::EnableAllDevices)
            .await
    }

    /// This is the async version of [`disable_all_devices`](RelayController::disable_all_devices).
    pub async fn disable_all_devices_async(
        &mut self,
        device_address: u8,
    ) -> Result<(), Error<T::Error>> {
        self.device_operation_async(device_address, DeviceOperation::DisableAllDevices)
            .await
    }

    /// This is the async version of [`enable_device`](RelayController::enable_device).
    pub async fn enable_device_async(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation_async(device_address, DeviceOperation::EnableSelectedDevice)
            .await
    }

    /// This is the async version of [`disable_device`](RelayController::disable_device).
    pub async fn disable_device_async(&mut self, device_address: u8) -> Result<(), Error<T::Error>> {
        self.device_operation_async(device_address, DeviceOperation::DisableSelectedDevice)
            .await
    }

    /// This is the async version of
    /// [`enable_device_exclusive`](RelayController::enable_device_exclusive).
    pub async fn enable_device_exclusive_async(
        &mut self,
        device_address: u8,
    ) -> Result<(), Error<T::Error>> {
        self.device_operation_async(device_address, DeviceOperation::EnableSelectedDeviceExclusive)
            .await
    }

    /// This is the async version of
    /// [`disable_device_exclusive`](RelayController::disable_device_exclusive).
    pub async fn disable_device_exclusive_async(
        &mut self,
        device_address: u8,
    ) -> Result<(), Error<T::Error>> {
        self.device_operation_async(
            device_address,
            DeviceOperation::DisableSelectedDeviceExclusive,
        )
        .await
    }

    /// This is the async version of [`store_device_number`](RelayController::store_device_number).
    pub async fn store_device_number_async(
        &mut self,
        device_address: u8,
    ) -> Result<(), Error<T::Error>> {
        self.device_operation_async(device_address, DeviceOperation::StoreDeviceNumber)
            .await
    }

    /// This is the async version of [`recall_device_number`](RelayController::recall_device_number).
    pub async fn recall_device_number_async(
        &mut self,
        device_address: u8,
    ) -> Result<u8, Error<T::Error>> {
        let device_address = self.board(device_address)?;
        let response = self
            .execute_async(Command::RecallDeviceNumber { device_address })
            .await?;
        Ok(expect_device_number(response)?)
    }
}
