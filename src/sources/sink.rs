//! Demo transport sink and license gate

use log::debug;

use crate::core::{LicenseGate, TransportError, TransportSink};

/// Transport sink that logs outbound payloads instead of writing to a
/// device. Always connected, never paused.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    sent: usize,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads transmitted so far.
    pub fn sent(&self) -> usize {
        self.sent
    }
}

impl TransportSink for ConsoleSink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.sent += 1;
        debug!("tx {} bytes: {}", bytes.len(), String::from_utf8_lossy(bytes));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// License gate with a fixed answer, set at construction.
#[derive(Debug, Clone, Copy)]
pub struct StaticLicense(pub bool);

impl LicenseGate for StaticLicense {
    fn is_licensed(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_sink_counts_payloads() {
        let mut sink = ConsoleSink::new();
        assert!(sink.is_connected());
        assert!(!sink.is_paused());
        sink.send(b"hello").unwrap();
        sink.send(b"world").unwrap();
        assert_eq!(sink.sent(), 2);
    }
}
