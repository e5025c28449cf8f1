use std::collections::{HashMap, HashSet};

use vesta::charger::link::RegisterLink;
use vesta::charger::{ChargerSession, SessionState};
use vesta::error::{Result, VestaError};
use vesta::registers;

fn u32_regs(v: u32) -> [u16; 2] {
    [(v >> 16) as u16, (v & 0xFFFF) as u16]
}

fn text_regs(s: &str, count: u16) -> Vec<u16> {
    let mut regs: Vec<u16> = s.bytes().map(u16::from).collect();
    regs.resize(count as usize, 0);
    regs
}

/// Canned register link with injectable failures per address
struct MockLink {
    connected: bool,
    connects: u32,
    input_blocks: HashMap<u16, Vec<u16>>,
    holding_blocks: HashMap<u16, Vec<u16>>,
    fail_reads: HashSet<u16>,
    protocol_faults: HashSet<u16>,
    fail_writes: HashSet<u16>,
    writes: Vec<(u16, u16)>,
    reads: Vec<u16>,
}

impl MockLink {
    fn healthy() -> Self {
        let mut input_blocks = HashMap::new();
        input_blocks.insert(
            registers::SERIAL_NUMBER.address,
            text_regs("EVC04ABC123", registers::SERIAL_NUMBER.count),
        );
        input_blocks.insert(
            registers::CHARGEPOINT_ID.address,
            text_regs("CP-0001", registers::CHARGEPOINT_ID.count),
        );
        input_blocks.insert(
            registers::BRAND.address,
            text_regs("Vestel", registers::BRAND.count),
        );
        input_blocks.insert(
            registers::MODEL.address,
            text_regs("EVC04", registers::MODEL.count),
        );
        input_blocks.insert(
            registers::FIRMWARE_VERSION.address,
            text_regs("v3.187.0", registers::FIRMWARE_VERSION.count),
        );

        // Charging, cable locked
        input_blocks.insert(registers::CHARGE_STATE.address, vec![2, 1, 1, 0, 2, 0, 0]);

        // Currents 16.0/16.1/15.9 A, voltages 230/231/229 V
        input_blocks.insert(
            registers::PHASE_MEASUREMENTS.address,
            vec![160, 0, 161, 0, 159, 0, 230, 0, 231, 0, 229],
        );

        let mut powers = Vec::new();
        for (value, pad) in [(11000u32, 2), (3800, 2), (3700, 2), (3500, 0)] {
            powers.extend_from_slice(&u32_regs(value));
            powers.extend(std::iter::repeat_n(0, pad));
        }
        input_blocks.insert(registers::PHASE_POWERS.address, powers);

        let mut session = Vec::new();
        session.extend_from_slice(&u32_regs(7400)); // energy Wh
        session.extend_from_slice(&u32_regs(84505)); // start 08:45:05
        session.extend_from_slice(&[0, 0]);
        session.extend_from_slice(&u32_regs(3600)); // duration
        session.extend_from_slice(&[0, 0]);
        session.extend_from_slice(&u32_regs(0)); // end
        input_blocks.insert(registers::SESSION_DATA.address, session);

        let mut holding_blocks = HashMap::new();
        holding_blocks.insert(registers::MAX_CURRENT.address, vec![16]);

        Self {
            connected: false,
            connects: 0,
            input_blocks,
            holding_blocks,
            fail_reads: HashSet::new(),
            protocol_faults: HashSet::new(),
            fail_writes: HashSet::new(),
            writes: Vec::new(),
            reads: Vec::new(),
        }
    }

    fn reads_of(&self, address: u16) -> usize {
        self.reads.iter().filter(|a| **a == address).count()
    }
}

#[async_trait::async_trait]
impl RegisterLink for MockLink {
    async fn connect(&mut self) -> Result<()> {
        if !self.connected {
            self.connects += 1;
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        self.reads.push(address);
        if self.fail_reads.contains(&address) {
            return Err(VestaError::modbus(format!("read failed at {}", address)));
        }
        if self.protocol_faults.contains(&address) {
            return Err(VestaError::protocol(
                format!("block {}", address),
                "value outside its domain".to_string(),
            ));
        }
        let block = self
            .input_blocks
            .get(&address)
            .ok_or_else(|| VestaError::modbus(format!("no block at {}", address)))?;
        Ok(block[..count as usize].to_vec())
    }

    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        self.reads.push(address);
        if self.fail_reads.contains(&address) {
            return Err(VestaError::modbus(format!("read failed at {}", address)));
        }
        let block = self
            .holding_blocks
            .get(&address)
            .ok_or_else(|| VestaError::modbus(format!("no block at {}", address)))?;
        Ok(block[..count as usize].to_vec())
    }

    async fn write_single_register(&mut self, address: u16, value: u16) -> Result<()> {
        if self.fail_writes.contains(&address) {
            return Err(VestaError::modbus(format!("write failed at {}", address)));
        }
        self.writes.push((address, value));
        Ok(())
    }
}

#[tokio::test]
async fn poll_produces_consistent_snapshot() {
    let mut session = ChargerSession::new(MockLink::healthy());

    let reading = session.poll().await.expect("healthy link yields a reading");

    assert_eq!(session.state(), SessionState::Ready);
    let identity = session.identity().unwrap();
    assert_eq!(identity.serial_number, "EVC04ABC123");
    assert_eq!(identity.brand, "Vestel");
    assert_eq!(identity.model, "EVC04");
    assert_eq!(identity.firmware_version, "v3.187.0");

    assert_eq!(reading.charge.charge_point_state, 2);
    assert!(reading.charge.charging_active);
    assert_eq!(reading.charge.cable_state, 2);
    assert_eq!(reading.power.power_total, 11000);
    assert_eq!(reading.power.power_l3, 3500);
    assert_eq!(reading.power.current_l2, 161);
    assert_eq!(reading.power.voltage_l3, 229);
    assert_eq!(reading.session.session_energy_wh, 7400);
    assert_eq!(reading.session.session_start, "08:45:05");
    assert_eq!(reading.session.session_duration_seconds, 3600);
    assert_eq!(reading.applied_max_current, 16);
    assert_eq!(reading.status.map(|s| s.code()), Some(2));
}

#[tokio::test]
async fn identity_is_read_once_per_session() {
    let mut session = ChargerSession::new(MockLink::healthy());

    assert!(session.poll().await.is_some());
    assert!(session.poll().await.is_some());
    assert!(session.poll().await.is_some());

    // The serial block is part of the one-time identity read only
    assert_eq!(session.link_ref().reads_of(registers::SERIAL_NUMBER.address), 1);
    assert_eq!(session.link_ref().reads_of(registers::CHARGE_STATE.address), 3);
}

#[tokio::test]
async fn failed_block_skips_update_and_reconnects() {
    let mut link = MockLink::healthy();
    link.fail_reads.insert(registers::PHASE_MEASUREMENTS.address);
    let mut session = ChargerSession::new(link);

    assert!(session.poll().await.is_none());
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(session.last_reading().is_none());

    // Device recovers; the next poll reconnects and succeeds
    session
        .link_mut()
        .fail_reads
        .remove(&registers::PHASE_MEASUREMENTS.address);
    assert!(session.poll().await.is_some());
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn commit_writes_heartbeat_then_latest_pending_limit() {
    let mut session = ChargerSession::new(MockLink::healthy());
    assert!(session.poll().await.is_some());

    // Two requests before a commit coalesce into one write of the latest
    session.set_max_current(10);
    session.set_max_current(13);
    session.commit().await;

    let writes = session.link_ref().writes.clone();
    assert_eq!(
        writes,
        vec![
            (registers::ALIVE_REGISTER, registers::ALIVE_VALUE),
            (registers::MAX_CURRENT.address, 13),
        ]
    );

    // Slot was cleared; the next commit is heartbeat only
    session.commit().await;
    let writes = session.link_ref().writes.clone();
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[2], (registers::ALIVE_REGISTER, registers::ALIVE_VALUE));
}

#[tokio::test]
async fn commit_is_skipped_while_disconnected() {
    let mut session = ChargerSession::new(MockLink::healthy());

    session.set_max_current(8);
    session.commit().await;

    assert!(session.link_ref().writes.is_empty());
}

#[tokio::test]
async fn failed_limit_write_keeps_value_pending() {
    let mut link = MockLink::healthy();
    link.fail_writes.insert(registers::MAX_CURRENT.address);
    let mut session = ChargerSession::new(link);

    assert!(session.poll().await.is_some());
    session.set_max_current(13);
    session.commit().await;

    // Heartbeat went through, the limit write did not
    assert_eq!(
        session.link_ref().writes,
        vec![(registers::ALIVE_REGISTER, registers::ALIVE_VALUE)]
    );
    assert_eq!(session.state(), SessionState::Disconnected);

    // Once the device accepts writes again the pending value is delivered
    session
        .link_mut()
        .fail_writes
        .remove(&registers::MAX_CURRENT.address);
    assert!(session.poll().await.is_some());
    session.commit().await;
    assert!(
        session
            .link_ref()
            .writes
            .contains(&(registers::MAX_CURRENT.address, 13))
    );
}

#[tokio::test]
async fn heartbeat_failure_drops_link_before_limit_write() {
    let mut link = MockLink::healthy();
    link.fail_writes.insert(registers::ALIVE_REGISTER);
    let mut session = ChargerSession::new(link);

    assert!(session.poll().await.is_some());
    session.set_max_current(6);
    session.commit().await;

    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(session.link_ref().writes.is_empty());
}

#[tokio::test]
async fn non_transport_fault_skips_update_but_keeps_link() {
    let mut link = MockLink::healthy();
    link.protocol_faults.insert(registers::SESSION_DATA.address);
    let mut session = ChargerSession::new(link);

    assert!(session.poll().await.is_none());
    assert_eq!(session.state(), SessionState::Connected);
    assert!(session.link_ref().is_connected());

    // The link survives; the next cycle succeeds without a reconnect
    session
        .link_mut()
        .protocol_faults
        .remove(&registers::SESSION_DATA.address);
    assert!(session.poll().await.is_some());
    assert_eq!(session.link_ref().connects, 1);
}

#[tokio::test]
async fn transport_failure_forces_reconnect() {
    let mut link = MockLink::healthy();
    link.fail_reads.insert(registers::SESSION_DATA.address);
    let mut session = ChargerSession::new(link);

    assert!(session.poll().await.is_none());
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!session.link_ref().is_connected());

    session
        .link_mut()
        .fail_reads
        .remove(&registers::SESSION_DATA.address);
    assert!(session.poll().await.is_some());
    assert_eq!(session.link_ref().connects, 2);
}

#[tokio::test]
async fn protocol_violation_withholds_status_only() {
    let mut link = MockLink::healthy();
    link.input_blocks
        .insert(registers::CHARGE_STATE.address, vec![9, 1, 1, 0, 2, 0, 0]);
    let mut session = ChargerSession::new(link);

    let reading = session.poll().await.expect("reading is still produced");

    assert_eq!(session.state(), SessionState::Ready);
    assert!(reading.status.is_none());
    assert_eq!(reading.charge.charge_point_state, 9);
    assert_eq!(reading.power.power_total, 11000);
}
