//! Transport Configuration
//!
//! Kind selection plus the per-kind parameters the factory reads at build time.
//! Every field can be set regardless of the selected kind; only
//! [`TransportFactory::build`](super::TransportFactory::build) decides which of
//! them are required.

use serde::{Deserialize, Serialize};

use super::kind::TransportKind;

/// Default device node for the `device` kind
pub const DEFAULT_DEVICE_PATH: &str = "/dev/tpm0";

/// Default simulator host for the `socket` kind
pub const DEFAULT_SOCKET_ADDRESS: &str = "127.0.0.1";

/// Simulator command port used when none is configured
pub const DEFAULT_SOCKET_PORT: u16 = 2321;

/// Default TCTI library for the `dynamic` kind
pub const DEFAULT_LIBRARY_NAME: &str = "libtss2-tcti-device.so.0";

/// Default configuration string handed to the dynamic TCTI
pub const DEFAULT_LIBRARY_CONF: &str = "/dev/tpm0";

/// Transport configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Which transport to build
    pub kind: TransportKind,

    /// Device node (`device` kind)
    pub device_path: Option<String>,

    /// Simulator host (`socket` kind)
    pub socket_address: Option<String>,

    /// Simulator port (`socket` kind); unset means [`DEFAULT_SOCKET_PORT`]
    pub socket_port: Option<u16>,

    /// TCTI library, resolved with the platform's `dlopen` search rules
    pub library_name: Option<String>,

    /// Opaque string passed verbatim to the library's initializer
    pub library_conf: Option<String>,
}

/// A single settable parameter, for table-driven binding
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportField {
    /// Sets `device_path`
    DevicePath(String),
    /// Sets `socket_address`
    SocketAddress(String),
    /// Sets `socket_port`
    SocketPort(u16),
    /// Sets `library_name`
    LibraryName(String),
    /// Sets `library_conf`
    LibraryConf(String),
}

impl TransportConfig {
    /// Configuration seeded with the documented defaults for every option
    ///
    /// This is what the daemon starts from before applying the config file,
    /// environment and command line.
    #[must_use]
    pub fn with_builtin_defaults() -> Self {
        Self {
            kind: TransportKind::default(),
            device_path: Some(DEFAULT_DEVICE_PATH.to_string()),
            socket_address: Some(DEFAULT_SOCKET_ADDRESS.to_string()),
            socket_port: Some(DEFAULT_SOCKET_PORT),
            library_name: Some(DEFAULT_LIBRARY_NAME.to_string()),
            library_conf: Some(DEFAULT_LIBRARY_CONF.to_string()),
        }
    }

    /// Store one field
    pub fn set(&mut self, field: TransportField) {
        match field {
            TransportField::DevicePath(v) => self.device_path = Some(v),
            TransportField::SocketAddress(v) => self.socket_address = Some(v),
            TransportField::SocketPort(v) => self.socket_port = Some(v),
            TransportField::LibraryName(v) => self.library_name = Some(v),
            TransportField::LibraryConf(v) => self.library_conf = Some(v),
        }
    }

    /// Port the socket backend will connect to
    #[must_use]
    pub fn effective_socket_port(&self) -> u16 {
        self.socket_port.unwrap_or(DEFAULT_SOCKET_PORT)
    }
}

impl TransportField {
    /// Config field name this value targets
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DevicePath(_) => "device_path",
            Self::SocketAddress(_) => "socket_address",
            Self::SocketPort(_) => "socket_port",
            Self::LibraryName(_) => "library_name",
            Self::LibraryConf(_) => "library_conf",
        }
    }
}
