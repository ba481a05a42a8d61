//! Transport Traits
//!
//! The contract every constructed TCTI satisfies, and the error taxonomy for
//! building and driving one.

use std::time::Duration;

use thiserror::Error;

use super::kind::TransportKind;

/// A constructed downstream TCTI
///
/// Instances are produced by [`TransportFactory`](super::TransportFactory) and
/// owned by the caller. Calls are synchronous and may block for as long as the
/// backend does.
pub trait Transport: Send {
    /// Kind this instance was built as
    fn kind(&self) -> TransportKind;

    /// Short human-readable endpoint description, e.g. `device:/dev/tpm0`
    fn describe(&self) -> String;

    /// Send one complete TPM command buffer
    fn transmit(&mut self, command: &[u8]) -> Result<(), TransportError>;

    /// Receive one complete TPM response buffer
    ///
    /// `None` blocks until a response arrives.
    fn receive(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>, TransportError>;
}

/// Errors from building or driving a transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The selected kind needs a parameter that was never set
    #[error("missing required TCTI option: {0}")]
    MissingField(&'static str),

    /// The selected kind cannot be built (the inert `none` kind)
    #[error("unsupported TCTI: {0}")]
    UnsupportedKind(TransportKind),

    /// The backend's own constructor reported failure
    #[error("TCTI initialization failed: {0}")]
    BackendInitFailed(#[source] BackendError),

    /// IO error from the underlying device or socket
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A dynamically loaded TCTI returned a non-success response code
    #[error("TCTI call failed with rc {rc:#010x}")]
    ResponseCode {
        /// TSS2 response code
        rc: u32,
    },

    /// Response header announced an impossible size
    #[error("malformed TPM response header (size {size})")]
    MalformedResponse {
        /// The size field as received
        size: u32,
    },
}

/// Failure reported while constructing a concrete backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Opening the device node failed
    #[error("failed to open TPM device {path}: {source}")]
    DeviceOpen {
        /// Device path that was attempted
        path: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Connecting to the simulator socket failed
    #[error("failed to connect to {address}:{port}: {source}")]
    SocketConnect {
        /// Host that was attempted
        address: String,
        /// Port that was attempted
        port: u16,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Loading or initializing a TCTI library failed
    #[error(transparent)]
    Dynamic(#[from] LoadError),
}

/// The step of the dynamic loading protocol that failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The library could not be opened
    #[error("could not load TCTI library {library}: {reason}")]
    Open {
        /// Library name as configured
        library: String,
        /// Loader diagnostic
        reason: String,
    },

    /// The library does not export the expected entry point
    #[error("TCTI library {library} does not export {symbol}")]
    MissingSymbol {
        /// Library name as configured
        library: String,
        /// Symbol that was looked up
        symbol: &'static str,
    },

    /// The entry point returned an unusable info table
    #[error("TCTI library {library} has an invalid info table: {reason}")]
    InvalidInfo {
        /// Library name as configured
        library: String,
        /// What was wrong with it
        reason: &'static str,
    },

    /// The configuration string cannot be passed to C (interior NUL)
    #[error("configuration string for TCTI library {library} contains a NUL byte")]
    InvalidConf {
        /// Library name as configured
        library: String,
    },

    /// The library's initializer rejected the configuration
    #[error("TCTI library {library} failed to initialize (rc {rc:#010x})")]
    Init {
        /// Library name as configured
        library: String,
        /// TSS2 response code returned by `init`
        rc: u32,
    },
}

impl From<LoadError> for TransportError {
    fn from(err: LoadError) -> Self {
        Self::BackendInitFailed(BackendError::Dynamic(err))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::MissingField("library_name");
        assert_eq!(err.to_string(), "missing required TCTI option: library_name");

        let err = TransportError::UnsupportedKind(TransportKind::None);
        assert_eq!(err.to_string(), "unsupported TCTI: none");

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err = TransportError::Io(io_err);
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_backend_failure_keeps_its_cause() {
        let err: TransportError = LoadError::Init {
            library: "libtss2-tcti-mssim.so.0".into(),
            rc: 0x000a_000b,
        }
        .into();

        let source = err.source().expect("backend error is the source");
        assert!(source.to_string().contains("libtss2-tcti-mssim.so.0"));
        assert!(source.to_string().contains("0x000a000b"));
        assert!(matches!(
            err,
            TransportError::BackendInitFailed(BackendError::Dynamic(LoadError::Init { rc: 0x000a_000b, .. }))
        ));
    }

    #[test]
    fn test_device_open_error_chain() {
        let err = BackendError::DeviceOpen {
            path: "/dev/tpm0".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/dev/tpm0"));
        assert!(err.source().is_some());
    }
}
