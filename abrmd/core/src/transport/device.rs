//! Device TCTI
//!
//! Talks to the kernel TPM driver through its character device. The driver
//! accepts one complete command per `write` and returns one complete response
//! per `read`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use super::kind::TransportKind;
use super::traits::{BackendError, Transport, TransportError};
use super::TPM_MAX_BUFFER;

/// Character device transport
pub struct DeviceTransport {
    path: String,
    file: File,
}

impl DeviceTransport {
    /// Open the device node read/write
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::DeviceOpen`] if the node cannot be opened.
    pub fn open(path: &str) -> Result<Self, BackendError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| BackendError::DeviceOpen {
                path: path.to_string(),
                source,
            })?;

        tracing::debug!(path = %path, "Opened TPM device");
        Ok(Self {
            path: path.to_string(),
            file,
        })
    }

    /// Device path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    fn wait_readable(&self, timeout: Duration) -> Result<(), TransportError> {
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

        let ready = unsafe { libc::poll(&mut pfd, 1, millis) };
        match ready {
            n if n < 0 => Err(std::io::Error::last_os_error().into()),
            0 => Err(std::io::Error::from(std::io::ErrorKind::TimedOut).into()),
            _ => Ok(()),
        }
    }
}

impl Transport for DeviceTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Device
    }

    fn describe(&self) -> String {
        format!("device:{}", self.path)
    }

    fn transmit(&mut self, command: &[u8]) -> Result<(), TransportError> {
        self.file.write_all(command)?;
        Ok(())
    }

    fn receive(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>, TransportError> {
        if let Some(timeout) = timeout {
            self.wait_readable(timeout)?;
        }

        let mut buf = vec![0u8; TPM_MAX_BUFFER];
        let n = self.file.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}
