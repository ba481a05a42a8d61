//! Socket TCTI
//!
//! Connects to the command port of a TPM2 simulator and speaks its framing:
//!
//! ```text
//! send:    u32 TPM_SEND_COMMAND | u8 locality | u32 len | command[len]
//! receive: u32 len | response[len] | u32 ack (0)
//! ```
//!
//! All integers are big-endian.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use super::kind::TransportKind;
use super::traits::{BackendError, Transport, TransportError};
use super::TPM_MAX_BUFFER;

const TPM_SEND_COMMAND: u32 = 8;
const LOCALITY_ZERO: u8 = 0;

/// Simulator socket transport
pub struct SocketTransport {
    address: String,
    port: u16,
    stream: TcpStream,
}

impl SocketTransport {
    /// Connect to `address:port`
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::SocketConnect`] if the connection fails.
    pub fn connect(address: &str, port: u16) -> Result<Self, BackendError> {
        let stream =
            TcpStream::connect((address, port)).map_err(|source| BackendError::SocketConnect {
                address: address.to_string(),
                port,
                source,
            })?;
        stream
            .set_nodelay(true)
            .map_err(|source| BackendError::SocketConnect {
                address: address.to_string(),
                port,
                source,
            })?;

        tracing::debug!(address = %address, port = port, "Connected to TPM simulator");
        Ok(Self {
            address: address.to_string(),
            port,
            stream,
        })
    }

    /// Zero-timeout readiness check; `TimedOut` if nothing is waiting
    fn poll_ready(&mut self) -> Result<(), TransportError> {
        let mut first = [0u8; 1];
        self.stream.set_nonblocking(true)?;
        let peeked = self.stream.peek(&mut first);
        self.stream.set_nonblocking(false)?;

        match peeked {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(std::io::Error::from(std::io::ErrorKind::TimedOut).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_u32(&mut self) -> Result<u32, TransportError> {
        let mut word = [0u8; 4];
        self.stream.read_exact(&mut word)?;
        Ok(u32::from_be_bytes(word))
    }
}

impl Transport for SocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    fn describe(&self) -> String {
        format!("socket:{}:{}", self.address, self.port)
    }

    fn transmit(&mut self, command: &[u8]) -> Result<(), TransportError> {
        let len = u32::try_from(command.len()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "command too large")
        })?;

        let mut frame = Vec::with_capacity(9 + command.len());
        frame.extend_from_slice(&TPM_SEND_COMMAND.to_be_bytes());
        frame.push(LOCALITY_ZERO);
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(command);

        self.stream.write_all(&frame)?;
        Ok(())
    }

    fn receive(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>, TransportError> {
        // std rejects a zero read timeout, so zero means poll once
        match timeout {
            Some(t) if t.is_zero() => {
                self.poll_ready()?;
                self.stream.set_read_timeout(None)?;
            }
            other => self.stream.set_read_timeout(other)?,
        }

        let size = self.read_u32()?;
        if size as usize > TPM_MAX_BUFFER {
            return Err(TransportError::MalformedResponse { size });
        }

        let mut response = vec![0u8; size as usize];
        self.stream.read_exact(&mut response)?;

        let ack = self.read_u32()?;
        if ack != 0 {
            return Err(TransportError::ResponseCode { rc: ack });
        }
        Ok(response)
    }
}
