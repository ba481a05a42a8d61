//! Transport Sink
//!
//! Lets a constructed TCTI sit at the end of a pipeline: every item enqueued
//! is transmitted downstream.
//!
//! `enqueue` has no return channel, so a failed transmit is held until the
//! owner collects it with [`TransportSink::take_error`].

use parking_lot::Mutex;

use super::traits::{Transport, TransportError};
use crate::source::Sink;

/// A [`Transport`] wrapped as a command [`Sink`]
pub struct TransportSink {
    transport: Mutex<Box<dyn Transport>>,
    last_error: Mutex<Option<TransportError>>,
}

impl TransportSink {
    /// Wrap a built transport
    #[must_use]
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport: Mutex::new(transport),
            last_error: Mutex::new(None),
        }
    }

    /// Most recent transmit failure not yet collected
    ///
    /// Each failure replaces the previous one; taking it clears the slot.
    #[must_use]
    pub fn take_error(&self) -> Option<TransportError> {
        self.last_error.lock().take()
    }

    /// Whether a transmit failure is waiting to be collected
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.last_error.lock().is_some()
    }

    /// Endpoint description of the wrapped transport
    pub fn describe(&self) -> String {
        self.transport.lock().describe()
    }

    /// Run `f` with exclusive access to the transport
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut dyn Transport) -> R) -> R {
        let mut guard = self.transport.lock();
        f(guard.as_mut())
    }
}

impl Sink<Vec<u8>> for TransportSink {
    fn enqueue(&self, command: Vec<u8>) {
        let mut transport = self.transport.lock();
        if let Err(e) = transport.transmit(&command) {
            tracing::warn!(
                tcti = %transport.describe(),
                error = %e,
                len = command.len(),
                "Failed to transmit command"
            );
            *self.last_error.lock() = Some(e);
        }
    }
}
