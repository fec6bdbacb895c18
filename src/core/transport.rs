//! Collaborator traits injected into the engine
//!
//! The engine never owns a serial port, socket or license check; the
//! composition root hands it trait objects for the transport sink and the
//! license gate. Tests substitute recording fakes.

use thiserror::Error;

/// Errors surfaced by a transport sink.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("transport rejected payload: {0}")]
    Rejected(String),
}

/// Outbound byte sink plus connection state, as provided by the I/O layer.
///
/// Transmission is fire-and-forget: the engine never retries a failed send,
/// it only logs it.
pub trait TransportSink {
    /// Transmit a payload. Called only from action activation.
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Whether outbound transmission is temporarily paused. A paused sink
    /// suppresses payload transmission but leaves timer logic untouched.
    fn is_paused(&self) -> bool {
        false
    }

    /// Whether a data stream is currently active. Gates all frame
    /// processing and the lifetime of action timers.
    fn is_connected(&self) -> bool;
}

/// Opaque licensed-capability flag.
///
/// Consulted once per reconfiguration; the engine caches the answer for the
/// whole rebuild so the capability cannot change meaning partway through.
pub trait LicenseGate {
    fn is_licensed(&self) -> bool;
}

pub type BoxedTransport = Box<dyn TransportSink>;
pub type BoxedLicense = Box<dyn LicenseGate>;
