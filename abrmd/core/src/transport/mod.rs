//! Downstream TCTI Layer
//!
//! Selects and constructs the transport the broker uses to reach the TPM:
//! - `device`: kernel character device (cargo feature `device`)
//! - `socket`: TPM2 simulator over TCP (cargo feature `socket`)
//! - `dynamic`: any TSS2 TCTI shared library, loaded at runtime
//!
//! # Flow
//!
//! ```text
//! CLI / env / config file ──► TransportFactory ──build()──► Box<dyn Transport>
//!                                   │                              │
//!                           TransportBackends               TransportSink
//!                        (System or injected)          (wired onto a Source)
//! ```
//!
//! The factory performs no I/O itself; whatever blocking or failure a backend's
//! constructor exhibits is passed straight through to the caller.

pub mod config;
#[cfg(feature = "device")]
pub mod device;
pub mod dynamic;
pub mod factory;
pub mod kind;
pub mod options;
pub mod sink;
#[cfg(feature = "socket")]
pub mod socket;
pub mod traits;

/// Largest command or response buffer a TPM exchanges
pub const TPM_MAX_BUFFER: usize = 4096;

// Re-exports for convenience
pub use config::{TransportConfig, TransportField, DEFAULT_SOCKET_PORT};
pub use dynamic::DynamicTransport;
pub use factory::{SystemBackends, TransportBackends, TransportFactory};
pub use kind::{kind_from_name, NameKindEntry, TransportKind, UnknownKindError, KIND_TABLE};
pub use options::{OptionEntry, OptionError, OptionGroup, OptionValueKind};
pub use sink::TransportSink;
pub use traits::{BackendError, LoadError, Transport, TransportError};

#[cfg(feature = "device")]
pub use device::DeviceTransport;
#[cfg(feature = "socket")]
pub use socket::SocketTransport;
