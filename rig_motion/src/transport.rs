//! Transport collaborator traits and their error type.
//!
//! This module defines:
//! - `RegisterTransport` - request/response register service of the motion controller
//! - `DiscreteIo` - coil / discrete-input service of the I/O controller
//! - `TransportError` - typed failure of a single exchange
//!
//! The core never opens or closes connections itself. Implementations are
//! expected to complete each exchange before returning, and to apply their
//! own retry policy; nothing above this layer retries.

use thiserror::Error;

/// Failure of one transport exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Peer did not answer the connection attempt.
    #[error("Controller unreachable")]
    Unreachable,

    /// Request sent but no response within the transport's own deadline.
    #[error("Transport timeout")]
    Timeout,

    /// Peer refused the session.
    #[error("Authentication rejected by controller")]
    Authentication,

    /// Peer answered with an exception code.
    #[error("Controller exception code {code}")]
    Exception {
        /// Exception code as reported by the controller.
        code: u8,
    },

    /// Connection lost or never established.
    #[error("Transport disconnected")]
    Disconnected,

    /// Lower-level I/O failure.
    #[error("Transport I/O error: {0}")]
    Io(String),
}

/// Register service of the motion controller.
///
/// # Contract
///
/// | Operation | Semantics |
/// |-----------|-----------|
/// | `read_registers(addr, n)` | Returns exactly `n` words starting at `addr` |
/// | `write_register(addr, v)` | Single holding-register write |
/// | `write_registers(addr, vs)` | Contiguous multi-register write |
///
/// One exchange is in flight at a time; callers serialize access.
pub trait RegisterTransport: Send {
    /// Read `count` consecutive 16-bit registers.
    fn read_registers(&mut self, addr: u16, count: u16) -> Result<Vec<u16>, TransportError>;

    /// Write one 16-bit register.
    fn write_register(&mut self, addr: u16, value: u16) -> Result<(), TransportError>;

    /// Write consecutive 16-bit registers starting at `addr`.
    fn write_registers(&mut self, addr: u16, values: &[u16]) -> Result<(), TransportError>;

    /// Open the session. Default: already connected.
    fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Close the session. Default: no-op.
    fn disconnect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Coil / discrete-input service of the separate I/O controller.
///
/// Addresses are opaque to the core.
pub trait DiscreteIo: Send {
    /// Read `count` coils starting at `addr`.
    fn read_coils(&mut self, addr: u16, count: u16) -> Result<Vec<bool>, TransportError>;

    /// Read `count` discrete inputs starting at `addr`.
    fn read_discrete_inputs(&mut self, addr: u16, count: u16)
    -> Result<Vec<bool>, TransportError>;

    /// Write one coil.
    fn write_coil(&mut self, addr: u16, value: bool) -> Result<(), TransportError>;
}
