//! Register-level protocol of the motion controller.
//!
//! [`RegisterProtocol`] is a cheap, cloneable handle to the one shared
//! transport. Every operation holds the transport lock for exactly one
//! exchange, so reads and writes of different axes never interleave.
//!
//! - [`map`] - Fixed address map
//! - [`codec`] - Float split, status word and command codes

pub mod codec;
pub mod map;

use crate::error::{RigError, RigResult};
use crate::poll::poll_until;
use crate::transport::{RegisterTransport, TransportError};
use codec::{decode_float, encode_float, AxisStatus, CommandCode};
use rig_common::rig::AxisAddress;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, trace, warn};

/// Shared handle to the motion controller's register service.
#[derive(Clone)]
pub struct RegisterProtocol {
    transport: Arc<Mutex<dyn RegisterTransport>>,
}

impl RegisterProtocol {
    /// Take ownership of a transport and wrap it for shared use.
    pub fn new(transport: impl RegisterTransport + 'static) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, dyn RegisterTransport + 'static>, TransportError> {
        self.transport
            .lock()
            .map_err(|_| TransportError::Disconnected)
    }

    /// Read one 16-bit register.
    pub fn read_word(&self, addr: u16) -> RigResult<u16> {
        let words = self.lock()?.read_registers(addr, 1)?;
        let word = words
            .first()
            .copied()
            .ok_or_else(|| TransportError::Io(format!("empty response reading {addr}")))?;
        trace!(addr, word, "read word");
        Ok(word)
    }

    /// Write one 16-bit register.
    pub fn write_word(&self, addr: u16, value: u16) -> RigResult<()> {
        trace!(addr, value, "write word");
        self.lock()?.write_register(addr, value)?;
        Ok(())
    }

    /// Read a float stored low word first at `addr`, high word at `addr + 1`.
    pub fn read_float(&self, addr: u16) -> RigResult<f32> {
        let words = self.lock()?.read_registers(addr, map::FLOAT_WIDTH)?;
        let [low, high] = words[..] else {
            return Err(TransportError::Io(format!(
                "expected 2 words at {addr}, got {}",
                words.len()
            ))
            .into());
        };
        let value = decode_float([low, high]);
        trace!(addr, value, "read float");
        Ok(value)
    }

    /// Write a float as two words in a single exchange.
    pub fn write_float(&self, addr: u16, value: f32) -> RigResult<()> {
        trace!(addr, value, "write float");
        self.lock()?.write_registers(addr, &encode_float(value))?;
        Ok(())
    }

    /// Read and decode the status word of `axis`.
    pub fn read_status(&self, axis: AxisAddress) -> RigResult<AxisStatus> {
        self.read_word(map::status(axis)).map(AxisStatus::from_word)
    }

    /// Write a command code to the command register of `axis`.
    pub fn write_command(&self, axis: AxisAddress, command: CommandCode) -> RigResult<()> {
        self.write_word(map::command(axis), command.code())
    }

    /// Request controller initialisation and wait for the ready handshake.
    ///
    /// Writes `SYSTEM_INIT_REQUEST` to the init register, then polls the
    /// ready register every `interval` until it reads `SYSTEM_READY_VALUE`.
    ///
    /// # Errors
    /// `RigError::SystemInitTimeout` if `timeout` expires first.
    pub fn initialize(&self, interval: Duration, timeout: Duration) -> RigResult<()> {
        self.write_word(map::SYSTEM_INIT, map::SYSTEM_INIT_REQUEST)?;
        let ready = poll_until(interval, timeout, || {
            Ok(self.read_word(map::SYSTEM_READY)? == map::SYSTEM_READY_VALUE)
        })?;
        if !ready {
            warn!("System ready not reported within {:?}", timeout);
            return Err(RigError::SystemInitTimeout);
        }
        info!("Motion controller initialised");
        Ok(())
    }

    /// Open the transport session.
    pub fn connect(&self) -> RigResult<()> {
        self.lock()?.connect()?;
        Ok(())
    }

    /// Close the transport session.
    pub fn disconnect(&self) -> RigResult<()> {
        self.lock()?.disconnect()?;
        Ok(())
    }
}

impl std::fmt::Debug for RegisterProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterProtocol").finish_non_exhaustive()
    }
}
