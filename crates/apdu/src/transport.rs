//! Transport trait for APDU communication with cards
//!
//! A transport is responsible for sending and receiving raw APDU bytes. It
//! has no knowledge of command structure, secure channels, or protocol
//! details. Exchange is half-duplex: one command must receive its response
//! before the next is issued.

use std::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::TransportError;

/// Trait for basic card transports
pub trait CardTransport: fmt::Debug {
    /// Send raw APDU bytes to the card and return the raw response
    ///
    /// Wraps [`Self::do_transmit_raw`] with tracing; implementations should
    /// override `do_transmit_raw` only.
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        trace!(command = %hex::encode(command), "transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode(response), "received raw response");
            }
            Err(e) => {
                debug!(error = ?e, "transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of `transmit_raw`
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Check if the transport is connected to a card
    fn is_connected(&self) -> bool;

    /// Reset the transport connection
    fn reset(&mut self) -> Result<(), TransportError>;
}

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    pub responses: Vec<Bytes>,
    pub commands: Vec<Bytes>,
    pub connected: bool,
}

#[cfg(test)]
impl MockTransport {
    pub fn with_response(response: Bytes) -> Self {
        Self {
            responses: vec![response],
            commands: Vec::new(),
            connected: true,
        }
    }
}

#[cfg(test)]
impl CardTransport for MockTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        if !self.connected {
            return Err(TransportError::Connection);
        }

        self.commands.push(Bytes::copy_from_slice(command));

        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }

        // Either clone the single response or take the next one
        if self.responses.len() == 1 {
            Ok(self.responses[0].clone())
        } else {
            Ok(self.responses.remove(0))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        self.commands.clear();
        Ok(())
    }
}
