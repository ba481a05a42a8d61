//! Transport Factory
//!
//! Holds the TCTI configuration and turns it into a constructed transport.
//!
//! Construction goes through [`TransportBackends`], so callers (and tests) can
//! substitute how each kind is actually built. [`TransportFactory::build`] uses
//! [`SystemBackends`], which opens real devices, sockets and libraries.

use super::config::{TransportConfig, TransportField};
use super::dynamic::DynamicTransport;
use super::kind::{kind_from_name, TransportKind, UnknownKindError};
use super::traits::{BackendError, Transport, TransportError};

#[cfg(feature = "device")]
use super::device::DeviceTransport;
#[cfg(feature = "socket")]
use super::socket::SocketTransport;

/// Construction contract for each buildable kind
///
/// The factory has already checked that every required parameter is present
/// when one of these is called.
pub trait TransportBackends {
    /// Open a character device TCTI
    #[cfg(feature = "device")]
    fn device(&self, path: &str) -> Result<Box<dyn Transport>, BackendError>;

    /// Connect a simulator socket TCTI
    #[cfg(feature = "socket")]
    fn socket(&self, address: &str, port: u16) -> Result<Box<dyn Transport>, BackendError>;

    /// Load and initialize a TCTI library; `conf` is `None` when there is no
    /// configuration string
    fn dynamic(&self, library: &str, conf: Option<&str>)
        -> Result<Box<dyn Transport>, BackendError>;
}

/// Backends that talk to the real system
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemBackends;

impl TransportBackends for SystemBackends {
    #[cfg(feature = "device")]
    fn device(&self, path: &str) -> Result<Box<dyn Transport>, BackendError> {
        Ok(Box::new(DeviceTransport::open(path)?))
    }

    #[cfg(feature = "socket")]
    fn socket(&self, address: &str, port: u16) -> Result<Box<dyn Transport>, BackendError> {
        Ok(Box::new(SocketTransport::connect(address, port)?))
    }

    fn dynamic(
        &self,
        library: &str,
        conf: Option<&str>,
    ) -> Result<Box<dyn Transport>, BackendError> {
        Ok(Box::new(DynamicTransport::load(library, conf)?))
    }
}

/// TCTI configuration holder and builder
#[derive(Clone, Debug, Default)]
pub struct TransportFactory {
    config: TransportConfig,
}

impl TransportFactory {
    /// Factory with every field unset and the default kind
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory starting from an existing configuration
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Consume the factory, returning its configuration
    #[must_use]
    pub fn into_config(self) -> TransportConfig {
        self.config
    }

    /// Currently selected kind
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        self.config.kind
    }

    /// Select a kind
    pub fn set_kind(&mut self, kind: TransportKind) {
        tracing::debug!(kind = %kind, "TCTI kind set");
        self.config.kind = kind;
    }

    /// Select a kind by table name
    ///
    /// The current kind is left untouched when `name` is not recognized.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownKindError`] naming the rejected value.
    pub fn set_kind_by_name(&mut self, name: &str) -> Result<(), UnknownKindError> {
        let kind = kind_from_name(name)?;
        self.set_kind(kind);
        Ok(())
    }

    /// Store one parameter
    pub fn set_field(&mut self, field: TransportField) {
        tracing::debug!(field = field.name(), value = ?field, "TCTI field set");
        self.config.set(field);
    }

    /// Set the device node
    pub fn set_device_path(&mut self, path: impl Into<String>) {
        self.set_field(TransportField::DevicePath(path.into()));
    }

    /// Set the simulator host
    pub fn set_socket_address(&mut self, address: impl Into<String>) {
        self.set_field(TransportField::SocketAddress(address.into()));
    }

    /// Set the simulator port
    pub fn set_socket_port(&mut self, port: u16) {
        self.set_field(TransportField::SocketPort(port));
    }

    /// Set the TCTI library name
    pub fn set_library_name(&mut self, name: impl Into<String>) {
        self.set_field(TransportField::LibraryName(name.into()));
    }

    /// Set the TCTI library configuration string
    pub fn set_library_conf(&mut self, conf: impl Into<String>) {
        self.set_field(TransportField::LibraryConf(conf.into()));
    }

    /// Build a transport for the configured kind using [`SystemBackends`]
    ///
    /// Every call constructs a new instance; nothing is cached.
    ///
    /// # Errors
    ///
    /// - [`TransportError::MissingField`] if the kind's required parameter is unset or empty
    /// - [`TransportError::UnsupportedKind`] for the `none` kind
    /// - [`TransportError::BackendInitFailed`] if the backend's constructor fails
    pub fn build(&self) -> Result<Box<dyn Transport>, TransportError> {
        self.build_with(&SystemBackends)
    }

    /// Build a transport for the configured kind using `backends`
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn build_with(
        &self,
        backends: &dyn TransportBackends,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let kind = self.config.kind;
        tracing::debug!(kind = %kind, "Building TCTI");

        let result = self.construct(backends);
        match &result {
            Ok(transport) => tracing::info!(tcti = %transport.describe(), "TCTI ready"),
            Err(e) => tracing::warn!(kind = %kind, error = %e, "Failed to build TCTI"),
        }
        result
    }

    fn construct(
        &self,
        backends: &dyn TransportBackends,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let config = &self.config;
        match config.kind {
            TransportKind::None => Err(TransportError::UnsupportedKind(TransportKind::None)),

            #[cfg(feature = "device")]
            TransportKind::Device => {
                let path = required(config.device_path.as_deref(), "device_path")?;
                backends
                    .device(path)
                    .map_err(TransportError::BackendInitFailed)
            }

            #[cfg(feature = "socket")]
            TransportKind::Socket => {
                let address = required(config.socket_address.as_deref(), "socket_address")?;
                backends
                    .socket(address, config.effective_socket_port())
                    .map_err(TransportError::BackendInitFailed)
            }

            TransportKind::Dynamic => {
                let library = required(config.library_name.as_deref(), "library_name")?;
                let conf = config.library_conf.as_deref().filter(|c| !c.is_empty());
                backends
                    .dynamic(library, conf)
                    .map_err(TransportError::BackendInitFailed)
            }
        }
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, TransportError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(TransportError::MissingField(field))
}
