//! Charger session orchestration
//!
//! `ChargerSession` owns the register link, runs the poll cycle over the
//! reading assemblers, holds last-known readings, and performs the
//! heartbeat + write-back commit step. Link failures never escape to the
//! caller: a failed cycle is reported as "no update" and the link is
//! re-established on the next one.

pub mod decode;
pub mod link;
pub mod readings;
pub mod status;
pub mod types;

use crate::error::Result;
use crate::logging::get_logger;
use crate::registers;
use link::RegisterLink;
use status::derive_status;
use std::sync::Mutex;
use types::{DeviceIdentity, MergedReading};

/// Session state machine
///
/// `Disconnected` is reachable from any state on link failure. The read
/// phase of a poll is pessimistically `Disconnected` so a cancelled
/// in-flight cycle forces a reconnect instead of presenting as `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Ready,
}

/// Pending current-limit slot shared between the setter and the commit
/// step. Safe to set from a different execution context than the
/// poll/commit cycle; the latest stored value wins.
struct MaxCurrentSlot {
    inner: Mutex<Option<u16>>,
}

impl MaxCurrentSlot {
    fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Store a new pending limit, overwriting any unsent one
    fn set(&self, amps: u16) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(amps);
        }
    }

    fn peek(&self) -> Option<u16> {
        self.inner.lock().ok().and_then(|slot| *slot)
    }

    /// Clear the slot, but only if it still holds `written`; a value stored
    /// after the write started must survive for the next commit.
    fn clear_if_unchanged(&self, written: u16) {
        if let Ok(mut slot) = self.inner.lock()
            && *slot == Some(written)
        {
            *slot = None;
        }
    }
}

/// One charger session over a register link
pub struct ChargerSession<L: RegisterLink> {
    link: L,
    state: SessionState,
    identity: Option<DeviceIdentity>,
    last_reading: Option<MergedReading>,
    pending_max_current: MaxCurrentSlot,
    logger: crate::logging::StructuredLogger,
}

impl<L: RegisterLink> ChargerSession<L> {
    /// Create a session over the given link; nothing is read until
    /// `connect` or the first `poll`.
    pub fn new(link: L) -> Self {
        Self {
            link,
            state: SessionState::Disconnected,
            identity: None,
            last_reading: None,
            pending_max_current: MaxCurrentSlot::new(),
            logger: get_logger("charger"),
        }
    }

    /// Establish the link if needed. Idempotent; the one-time identity
    /// read runs on the first successful connect.
    pub async fn connect(&mut self) -> Result<()> {
        self.link.connect().await?;

        if self.identity.is_none() {
            let identity = readings::read_identity(&mut self.link).await?;
            self.logger.info(&format!(
                "Connected to device: serial={} model={} brand={} firmware={}",
                identity.serial_number, identity.model, identity.brand, identity.firmware_version
            ));
            self.identity = Some(identity);
        }

        if self.state == SessionState::Disconnected {
            self.state = SessionState::Connected;
        }
        Ok(())
    }

    /// Run one full read cycle.
    ///
    /// Returns a fully consistent snapshot, or `None` when any read failed;
    /// callers must treat `None` as "skip this update". A transport failure
    /// drops the link and the next poll reconnects; a non-transport fault
    /// keeps the link but still discards the cycle.
    pub async fn poll(&mut self) -> Option<MergedReading> {
        if let Err(e) = self.connect().await {
            self.logger
                .warn(&format!("Connect failed, skipping update: {}", e));
            self.drop_link().await;
            return None;
        }

        // Pessimistic until the cycle completes: a cancelled poll must not
        // look Ready.
        self.state = SessionState::Disconnected;

        match self.read_cycle().await {
            Ok(reading) => {
                self.state = SessionState::Ready;
                self.last_reading = Some(reading.clone());
                Some(reading)
            }
            Err(e) => {
                self.logger
                    .warn(&format!("Poll cycle failed, skipping update: {}", e));
                if e.is_link_failure() {
                    self.drop_link().await;
                } else {
                    self.state = SessionState::Connected;
                }
                None
            }
        }
    }

    /// Request a new current limit; written on the next commit. May be
    /// called from any context, latest value wins.
    pub fn set_max_current(&self, amps: u16) {
        self.logger
            .info(&format!("New max current will be set to {} A", amps));
        self.pending_max_current.set(amps);
    }

    /// Write the heartbeat marker and any pending current limit.
    ///
    /// Requires a connected session; skipped silently when disconnected.
    /// The pending slot is cleared only after a confirmed write, and only
    /// if no newer value arrived meanwhile.
    pub async fn commit(&mut self) {
        if self.state == SessionState::Disconnected {
            self.logger.debug("Commit skipped: not connected");
            return;
        }

        if let Err(e) = self
            .link
            .write_single_register(registers::ALIVE_REGISTER, registers::ALIVE_VALUE)
            .await
        {
            self.logger.warn(&format!("Heartbeat write failed: {}", e));
            self.drop_link().await;
            return;
        }

        if let Some(amps) = self.pending_max_current.peek() {
            match self
                .link
                .write_single_register(registers::MAX_CURRENT.address, amps)
                .await
            {
                Ok(()) => {
                    self.logger.info(&format!("Max current set to {} A", amps));
                    self.pending_max_current.clear_if_unchanged(amps);
                }
                Err(e) => {
                    // Pending value stays queued for the next cycle
                    self.logger
                        .warn(&format!("Max current write failed: {}", e));
                    self.drop_link().await;
                }
            }
        }
    }

    /// Release the link; safe from any state
    pub async fn close(&mut self) {
        self.drop_link().await;
    }

    /// Device identity, available after the first successful connect
    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    /// Last fully consistent reading, if any cycle has succeeded
    pub fn last_reading(&self) -> Option<&MergedReading> {
        self.last_reading.as_ref()
    }

    /// Composite status from the last successful cycle
    pub fn status(&self) -> Option<status::ChargerStatus> {
        self.last_reading.as_ref().and_then(|r| r.status)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Direct access to the underlying link
    pub fn link_ref(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    async fn read_cycle(&mut self) -> Result<MergedReading> {
        let charge = readings::read_charge_state(&mut self.link).await?;
        let power = readings::read_power(&mut self.link).await?;
        let session = readings::read_session(&mut self.link).await?;
        let applied_max_current = readings::read_max_current(&mut self.link).await?;

        let status = match derive_status(charge.cable_state, charge.charge_point_state) {
            Ok(status) => Some(status),
            Err(e) => {
                // Withhold the status for this cycle instead of guessing
                self.logger.warn(&format!("{}", e));
                None
            }
        };

        Ok(MergedReading {
            charge,
            power,
            session,
            applied_max_current,
            status,
        })
    }

    async fn drop_link(&mut self) {
        let _ = self.link.disconnect().await;
        self.state = SessionState::Disconnected;
    }
}
