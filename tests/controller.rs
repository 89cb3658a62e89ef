use std::collections::VecDeque;

use embedded_io::{ErrorKind, ErrorType};
use futures::executor::block_on;
use proxr::{
    checksum, is_zero_sum, AddressError, BankOperation, BankUpdate, Board, BoardRevision,
    BoardTopology, Command, DecodeError, DeviceIdentification, Error, OpcodeFamily, OpcodeTable,
    RefreshMode, RelayAction, RelayController, RelayMask, RelayRef, Reporting, Ticks,
    TransportError, ACK, NACK,
};

/// In-memory transport recording writes and serving queued reply bytes
#[derive(Default)]
struct MockTransport {
    written: Vec<u8>,
    replies: VecDeque<u8>,
    fail_writes: bool,
    fail_reads: bool,
}

impl MockTransport {
    fn with_replies(replies: &[&[u8]]) -> Self {
        Self {
            replies: replies.iter().flat_map(|r| r.iter().copied()).collect(),
            ..Self::default()
        }
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        if self.fail_writes {
            return Err(ErrorKind::Other);
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        if self.fail_reads {
            return Err(ErrorKind::Other);
        }
        let n = buf.len().min(self.replies.len());
        for (slot, byte) in buf.iter_mut().zip(self.replies.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl ErrorType for MockTransport {
    type Error = ErrorKind;
}

impl embedded_io::Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.write_bytes(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io::Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.read_bytes(buf)
    }
}

impl embedded_io_async::Write for MockTransport {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.write_bytes(buf)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io_async::Read for MockTransport {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.read_bytes(buf)
    }
}

/// Transport without a read half, like a one-way serial link
#[derive(Default)]
struct WriteOnlyLink {
    written: Vec<u8>,
}

impl ErrorType for WriteOnlyLink {
    type Error = ErrorKind;
}

impl embedded_io::Write for WriteOnlyLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn reply(address: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = vec![address];
    body.extend_from_slice(payload);
    let mut out = vec![address, checksum(&body)];
    out.extend_from_slice(payload);
    out
}

fn ack(address: u8) -> Vec<u8> {
    reply(address, &[ACK])
}

fn single_board() -> BoardTopology<1> {
    BoardTopology::new([Board::new(0x01, 2)]).unwrap()
}

fn controller(transport: MockTransport) -> RelayController<MockTransport, 1> {
    RelayController::new(transport, single_board())
}

#[test]
fn turn_on_writes_the_expected_frame() {
    let mut controller = controller(MockTransport::with_replies(&[&ack(0x01)]));

    controller.turn_on(RelayRef::new(0x01, 0, 3)).unwrap();

    let transport = controller.release();
    let on = OpcodeTable::PROXR.set_relay_on;
    let check = checksum(&[0x01, on, 0x00, 0x03]);
    assert_eq!(transport.written, vec![0x01, on, 0x00, 0x03, check]);
    assert!(is_zero_sum(&transport.written));
    assert!(transport.replies.is_empty());
}

#[test]
fn query_bank_status_decodes_the_mask() {
    let mut controller = controller(MockTransport::with_replies(&[&[0x01, 0xAA, 0x55]]));

    let mask = controller.query_bank_status(0x01, 0).unwrap();
    assert_eq!(mask.bits(), 0x55);

    let transport = controller.release();
    let query = OpcodeTable::PROXR.query_bank_status;
    assert_eq!(
        transport.written,
        vec![0x01, query, 0x00, checksum(&[0x01, query, 0x00])]
    );
}

#[test]
fn corrupted_query_reply_is_a_checksum_mismatch() {
    let mut controller = controller(MockTransport::with_replies(&[&[0x01, 0xAA, 0x54]]));

    assert_eq!(
        controller.query_bank_status(0x01, 0),
        Err(Error::Decode(DecodeError::ChecksumMismatch))
    );
}

#[test]
fn corrupted_acknowledgement_is_a_checksum_mismatch() {
    let mut corrupted = ack(0x01);
    corrupted[1] ^= 0x08;
    let mut controller = controller(MockTransport::with_replies(&[&corrupted]));

    assert_eq!(
        controller.turn_on(RelayRef::new(0x01, 0, 0)),
        Err(Error::Decode(DecodeError::ChecksumMismatch))
    );
}

#[test]
fn address_errors_write_nothing() {
    let mut controller = controller(MockTransport::default());

    assert_eq!(
        controller.turn_on(RelayRef::new(0x01, 0, 8)),
        Err(Error::Address(AddressError::BitOutOfRange(8)))
    );
    assert_eq!(
        controller.toggle(RelayRef::new(0x09, 0, 0)),
        Err(Error::Address(AddressError::UnknownBoard(0x09)))
    );
    assert_eq!(
        controller.query_bank_status(0x01, 2),
        Err(Error::Address(AddressError::BankOutOfRange {
            device_address: 0x01,
            bank: 2,
            bank_count: 2
        }))
    );
    assert_eq!(
        controller.start_flasher(RelayRef::global(16), 1, 1),
        Err(Error::Address(AddressError::IndexOutOfRange {
            index: 16,
            relay_count: 16
        }))
    );
    assert_eq!(
        controller.set_bank(0x01, 0, BankUpdate::new(RelayMask::RELAY_0, RelayMask::empty())),
        Err(Error::Address(AddressError::MissingSnapshot))
    );

    assert!(controller.release().written.is_empty());
}

#[test]
fn set_bank_folds_the_snapshot() {
    let mut controller = controller(MockTransport::with_replies(&[&ack(0x01)]));

    let update = BankUpdate::new(
        RelayMask::from_bits_retain(0b0000_0101),
        RelayMask::from_bits_retain(0b0000_0010),
    )
    .with_previous(RelayMask::empty());
    controller.set_bank(0x01, 1, update).unwrap();

    let written = controller.release().written;
    assert_eq!(&written[1..4], &[OpcodeTable::PROXR.set_bank_mask, 0b0000_0101, 0x01]);
}

#[test]
fn nack_is_reported_as_device_rejection() {
    let mut controller = controller(MockTransport::with_replies(&[&reply(0x01, &[NACK])]));

    assert_eq!(
        controller.start_timer(RelayRef::new(0x01, 1, 2), Ticks(40), false),
        Err(Error::Decode(DecodeError::DeviceNack))
    );
}

#[test]
fn reply_from_another_board_is_rejected() {
    let mut controller = controller(MockTransport::with_replies(&[&ack(0x02)]));

    assert_eq!(
        controller.turn_off(RelayRef::new(0x01, 0, 1)),
        Err(Error::Decode(DecodeError::UnexpectedAddress {
            expected: 0x01,
            found: 0x02
        }))
    );
}

#[test]
fn disabled_reporting_reads_only_query_replies() {
    let mut controller = controller(MockTransport::with_replies(&[&reply(0x01, &[0x81])]))
        .with_reporting(Reporting::Disabled);

    controller.turn_on(RelayRef::new(0x01, 0, 0)).unwrap();
    controller.toggle(RelayRef::new(0x01, 0, 7)).unwrap();
    controller.all_off(0x01, 1).unwrap();
    assert_eq!(
        controller.query_bank_status(0x01, 0).unwrap(),
        RelayMask::RELAY_0 | RelayMask::RELAY_7
    );

    let transport = controller.release();
    assert!(transport.replies.is_empty());
    assert_eq!(transport.written.len(), 5 + 5 + 4 + 4);
}

#[test]
fn frames_are_written_in_call_order() {
    let mut controller =
        controller(MockTransport::default()).with_reporting(Reporting::Disabled);

    controller.turn_on(RelayRef::new(0x01, 0, 1)).unwrap();
    controller.turn_off(RelayRef::new(0x01, 0, 1)).unwrap();
    controller.invert_bank(0x01, 1).unwrap();

    let table = OpcodeTable::PROXR;
    let written = controller.release().written;
    assert_eq!(written[1], table.set_relay_on);
    assert_eq!(written[6], table.set_relay_off);
    assert_eq!(written[11], table.invert_bank);
    assert!(is_zero_sum(&written[..5]));
    assert!(is_zero_sum(&written[5..10]));
    assert!(is_zero_sum(&written[10..]));
}

#[test]
fn write_failures_surface_as_transport_errors() {
    let mut transport = MockTransport::default();
    transport.fail_writes = true;
    let mut controller = controller(transport);

    assert_eq!(
        controller.turn_on(RelayRef::new(0x01, 0, 0)),
        Err(Error::Transport(TransportError::Write(ErrorKind::Other)))
    );
}

#[test]
fn read_failures_surface_as_transport_errors() {
    let mut transport = MockTransport::default();
    transport.fail_reads = true;
    let mut controller = controller(transport);

    assert_eq!(
        controller.query_bank_status(0x01, 1),
        Err(Error::Transport(TransportError::Read(ErrorKind::Other)))
    );
}

#[test]
fn truncated_reply_is_unexpected_eof() {
    let mut controller = controller(MockTransport::with_replies(&[&[0x01, 0xAA]]));

    assert_eq!(
        controller.query_bank_status(0x01, 0),
        Err(Error::Transport(TransportError::UnexpectedEof))
    );
}

#[test]
fn test_comms_expects_an_ack_even_without_reporting() {
    let mut controller = controller(MockTransport::with_replies(&[&ack(0x01)]))
        .with_reporting(Reporting::Disabled);

    controller.test_comms(0x01).unwrap();

    let transport = controller.release();
    assert!(transport.replies.is_empty());
    assert_eq!(transport.written.len(), 3);
}

#[test]
fn identify_reads_board_identification() {
    let mut controller = controller(MockTransport::with_replies(&[&reply(
        0x01,
        &[1, 0, 17, 205],
    )]));

    assert_eq!(
        controller.identify(0x01),
        Ok(DeviceIdentification {
            device_id: 1,
            firmware_version: 17,
            firmware_year: 2005,
        })
    );
}

#[test]
fn power_up_defaults_round_trip_through_the_board() {
    let mut controller = controller(MockTransport::with_replies(&[
        &ack(0x01),
        &reply(0x01, &[0x0F]),
    ]));

    controller.store_power_up_defaults(0x01, 1).unwrap();
    assert_eq!(controller.query_power_up_defaults(0x01, 1).unwrap().bits(), 0x0F);
}

#[test]
fn each_board_uses_its_own_opcode_table() {
    let topology = BoardTopology::new([
        Board::new(0x01, 1),
        Board::new(0x02, 1).with_revision(BoardRevision::ProXrLegacy),
    ])
    .unwrap();
    let mut controller = RelayController::new(MockTransport::default(), topology)
        .with_reporting(Reporting::Disabled);

    controller.toggle(RelayRef::new(0x01, 0, 0)).unwrap();
    controller.toggle(RelayRef::global(8)).unwrap();

    let written = controller.release().written;
    assert_eq!(written[1], OpcodeTable::PROXR.toggle_relay);
    assert_eq!(&written[5..7], &[0x02, OpcodeTable::PROXR_LEGACY.toggle_relay]);
}

#[test]
fn async_operations_match_blocking_ones() {
    let mut controller = controller(MockTransport::with_replies(&[
        &ack(0x01),
        &[0x01, 0xAA, 0x55],
        &ack(0x01),
        &ack(0x01),
    ]));

    block_on(controller.turn_on_async(RelayRef::new(0x01, 0, 3))).unwrap();
    let mask = block_on(controller.query_bank_status_async(0x01, 0)).unwrap();
    assert_eq!(mask.bits(), 0x55);
    block_on(controller.all_off_async(0x01, 1)).unwrap();
    block_on(controller.store_power_up_defaults_async(0x01, 1)).unwrap();

    let table = OpcodeTable::PROXR;
    let written = controller.release().written;
    assert_eq!(&written[..4], &[0x01, table.set_relay_on, 0x00, 0x03]);
    assert_eq!(&written[9..12], &[0x01, table.bank_all_off, 0x01]);
    assert_eq!(&written[13..16], &[0x01, table.store_power_up_defaults, 0x01]);
    assert_eq!(written.len(), 5 + 4 + 4 + 4);
}

#[test]
fn async_errors_match_blocking_ones() {
    let mut controller = controller(MockTransport::with_replies(&[&reply(0x01, &[NACK])]));

    assert_eq!(
        block_on(controller.start_flasher_async(RelayRef::new(0x01, 0, 0), 2, 2)),
        Err(Error::Decode(DecodeError::DeviceNack))
    );
    assert_eq!(
        block_on(controller.turn_off_async(RelayRef::new(0x03, 0, 0))),
        Err(Error::Address(AddressError::UnknownBoard(0x03)))
    );
}

fn two_boards() -> BoardTopology<2> {
    BoardTopology::new([Board::new(0x01, 2), Board::new(0x05, 1)]).unwrap()
}

#[test]
fn execute_rejects_banks_missing_from_its_topology() {
    let wide = BoardTopology::new([Board::new(0x01, 4)]).unwrap();
    let bank = wide.resolve_bank(0x01, 3).unwrap();
    let mut controller = RelayController::new(
        MockTransport::default(),
        BoardTopology::new([Board::new(0x01, 1)]).unwrap(),
    );

    assert_eq!(
        controller.execute(Command::BankOperation {
            bank,
            operation: BankOperation::AllOn,
        }),
        Err(Error::Address(AddressError::BankOutOfRange {
            device_address: 0x01,
            bank: 3,
            bank_count: 1
        }))
    );
    assert!(controller.release().written.is_empty());
}

#[test]
fn timer_resting_on_sets_the_top_relay_bit() {
    let mut controller = controller(MockTransport::with_replies(&[&ack(0x01)]));

    controller
        .start_timer(RelayRef::new(0x01, 1, 2), Ticks(0x0203), true)
        .unwrap();

    let written = controller.release().written;
    assert_eq!(
        &written[..6],
        &[0x01, OpcodeTable::PROXR.start_timer, 0x01, 0x82, 0x02, 0x03]
    );
    assert!(is_zero_sum(&written));
}

#[test]
fn global_index_addresses_the_right_board() {
    let mut controller =
        RelayController::new(MockTransport::with_replies(&[&ack(0x05)]), two_boards());

    // Board 0x01 holds relays 0..16, board 0x05 relays 16..24
    controller.turn_on(RelayRef::global(21)).unwrap();

    let on = OpcodeTable::PROXR.set_relay_on;
    assert_eq!(
        controller.release().written,
        vec![0x05, on, 0x00, 0x05, checksum(&[0x05, on, 0x00, 0x05])]
    );
}

#[test]
fn global_index_boundary_spans_every_board() {
    let mut controller =
        RelayController::new(MockTransport::with_replies(&[&ack(0x05)]), two_boards());

    controller.toggle(RelayRef::global(23)).unwrap();
    assert_eq!(
        controller.turn_off(RelayRef::global(24)),
        Err(Error::Address(AddressError::IndexOutOfRange {
            index: 24,
            relay_count: 24
        }))
    );

    let written = controller.release().written;
    assert_eq!(&written[..4], &[0x05, OpcodeTable::PROXR.toggle_relay, 0x00, 0x07]);
    assert_eq!(written.len(), 5);
}

#[test]
fn write_only_link_dispatches_unanswered_commands() {
    let topology = single_board();
    let relay = topology.resolve(RelayRef::new(0x01, 1, 4)).unwrap();
    let bank = topology.resolve_bank(0x01, 0).unwrap();
    let mut controller =
        RelayController::new(WriteOnlyLink::default(), topology).with_reporting(Reporting::Disabled);

    controller
        .dispatch(Command::SetRelay {
            relay,
            action: RelayAction::Off,
        })
        .unwrap();
    assert_eq!(
        controller.dispatch(Command::QueryStatus { bank }),
        Err(Error::ReplyRequired(OpcodeFamily::QueryBankStatus))
    );

    let written = controller.release().written;
    assert_eq!(&written[..4], &[0x01, OpcodeTable::PROXR.set_relay_off, 0x01, 0x04]);
    assert_eq!(written.len(), 5);
}

#[test]
fn dispatch_refuses_acknowledged_commands_in_reporting_mode() {
    let topology = single_board();
    let relay = topology.resolve(RelayRef::new(0x01, 0, 0)).unwrap();
    let mut controller = RelayController::new(WriteOnlyLink::default(), topology);

    assert_eq!(
        controller.dispatch(Command::SetRelay {
            relay,
            action: RelayAction::On,
        }),
        Err(Error::ReplyRequired(OpcodeFamily::SetRelayOn))
    );
    assert!(controller.release().written.is_empty());
}

#[test]
fn reporting_mode_changes_are_followed() {
    let mut controller = controller(MockTransport::with_replies(&[&ack(0x01), &ack(0x01)]));

    controller.set_reporting(0x01, Reporting::Disabled).unwrap();
    assert_eq!(controller.reporting(), Reporting::Disabled);
    // No acknowledgement expected any more
    controller.turn_on(RelayRef::new(0x01, 0, 0)).unwrap();

    controller.set_reporting(0x01, Reporting::Enabled).unwrap();
    assert_eq!(controller.reporting(), Reporting::Enabled);
    controller.turn_off(RelayRef::new(0x01, 0, 0)).unwrap();

    let transport = controller.release();
    assert!(transport.replies.is_empty());
    assert_eq!(transport.written[1], OpcodeTable::PROXR.disable_reporting);
    assert_eq!(transport.written[9], OpcodeTable::PROXR.enable_reporting);
}

#[test]
fn rejected_reporting_change_keeps_the_mode() {
    let mut controller = controller(MockTransport::with_replies(&[&reply(0x01, &[NACK])]));

    assert_eq!(
        controller.set_reporting(0x01, Reporting::Disabled),
        Err(Error::Decode(DecodeError::DeviceNack))
    );
    assert_eq!(controller.reporting(), Reporting::Enabled);
}

#[test]
fn relay_status_and_refresh_queries() {
    let mut controller = controller(MockTransport::with_replies(&[
        &reply(0x01, &[1]),
        &reply(0x01, &[0]),
        &ack(0x01),
    ]));

    assert!(controller.query_relay_status(RelayRef::new(0x01, 1, 6)).unwrap());
    assert_eq!(controller.query_refresh_mode(0x01), Ok(RefreshMode::Manual));
    controller.refresh_relays(0x01).unwrap();

    let table = OpcodeTable::PROXR;
    let written = controller.release().written;
    assert_eq!(&written[..4], &[0x01, table.query_relay_status, 0x01, 0x06]);
    assert_eq!(&written[5..7], &[0x01, table.query_refresh_mode]);
    assert_eq!(&written[8..10], &[0x01, table.refresh_relays]);
}

#[test]
fn e3c_device_selection_and_numbers() {
    let mut controller = RelayController::new(
        MockTransport::with_replies(&[&ack(0x05), &reply(0x05, &[0x05])]),
        two_boards(),
    );

    controller.enable_device_exclusive(0x05).unwrap();
    assert_eq!(controller.recall_device_number(0x05), Ok(0x05));
    assert_eq!(
        controller.disable_all_devices(0x02),
        Err(Error::Address(AddressError::UnknownBoard(0x02)))
    );

    let table = OpcodeTable::PROXR;
    let written = controller.release().written;
    assert_eq!(
        written,
        vec![
            0x05,
            table.enable_selected_device_exclusive,
            checksum(&[0x05, table.enable_selected_device_exclusive]),
            0x05,
            table.recall_device_number,
            checksum(&[0x05, table.recall_device_number]),
        ]
    );
}

#[test]
fn async_device_operations_match_blocking_ones() {
    let mut controller = controller(MockTransport::with_replies(&[&ack(0x01), &reply(0x01, &[1])]));

    block_on(controller.disable_auto_refresh_async(0x01)).unwrap();
    assert_eq!(
        block_on(controller.query_refresh_mode_async(0x01)),
        Ok(RefreshMode::Automatic)
    );
    block_on(controller.set_reporting_async(0x01, Reporting::Disabled)).unwrap_err();
    assert_eq!(controller.reporting(), Reporting::Enabled);
}
