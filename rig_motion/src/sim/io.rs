//! Simulated coil / discrete-input controller.

use crate::transport::{DiscreteIo, TransportError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct IoState {
    coils: HashMap<u16, bool>,
    inputs: HashMap<u16, bool>,
    failing: bool,
}

/// In-memory I/O controller. Unset points read as `false`.
///
/// Clones share state, like [`SimulatedController`](super::SimulatedController).
#[derive(Debug, Clone, Default)]
pub struct SimulatedIo {
    state: Arc<Mutex<IoState>>,
}

impl SimulatedIo {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, IoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drive a coil from the outside, e.g. a panel lamp set by the controller.
    pub fn set_coil(&self, addr: u16, value: bool) {
        self.state().coils.insert(addr, value);
    }

    /// Drive a discrete input.
    pub fn set_input(&self, addr: u16, value: bool) {
        self.state().inputs.insert(addr, value);
    }

    pub fn coil(&self, addr: u16) -> bool {
        self.state().coils.get(&addr).copied().unwrap_or(false)
    }

    /// Fail every exchange until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }

    fn read(map: &HashMap<u16, bool>, addr: u16, count: u16) -> Vec<bool> {
        (0..count)
            .map(|i| {
                addr.checked_add(i)
                    .and_then(|a| map.get(&a).copied())
                    .unwrap_or(false)
            })
            .collect()
    }
}

impl DiscreteIo for SimulatedIo {
    fn read_coils(&mut self, addr: u16, count: u16) -> Result<Vec<bool>, TransportError> {
        let state = self.state();
        if state.failing {
            return Err(TransportError::Unreachable);
        }
        Ok(Self::read(&state.coils, addr, count))
    }

    fn read_discrete_inputs(
        &mut self,
        addr: u16,
        count: u16,
    ) -> Result<Vec<bool>, TransportError> {
        let state = self.state();
        if state.failing {
            return Err(TransportError::Unreachable);
        }
        Ok(Self::read(&state.inputs, addr, count))
    }

    fn write_coil(&mut self, addr: u16, value: bool) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.failing {
            return Err(TransportError::Unreachable);
        }
        state.coils.insert(addr, value);
        Ok(())
    }
}
