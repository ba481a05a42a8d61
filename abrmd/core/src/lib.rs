//! abrmd Core - TPM2 Access Broker Transport Layer
//!
//! This crate holds the pieces of the access broker that decide how it talks to
//! the TPM and how pipeline stages are wired together. It has no dependency on
//! the daemon's runtime, so it can be driven from the daemon, from tests, or
//! from any other front end.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        abrmd-daemon                           │
//! │   clap options ─► ConfigOverrides ─► BrokerConfig             │
//! └───────────────────────────────┬──────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┼──────────────────────────────┐
//! │                          ABRMD CORE                           │
//! │                               ▼                               │
//! │  TransportFactory ──build()──► Box<dyn Transport>             │
//! │        │                              │                       │
//! │  KIND_TABLE / options          TransportSink (Sink)           │
//! │                                       ▲                       │
//! │                         FanOutSource ─┘ add_sink              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`TransportFactory`]: holds TCTI configuration and builds transports
//! - [`TransportKind`]: the compiled-in set of downstream TCTIs
//! - [`Transport`]: a constructed downstream channel
//! - [`Source`] / [`Sink`]: registration contract for pipeline stages
//!
//! # Quick Start
//!
//! ```ignore
//! use abrmd_core::transport::{TransportFactory, TransportKind};
//!
//! let mut factory = TransportFactory::new();
//! factory.set_kind(TransportKind::Dynamic);
//! factory.set_library_name("libtss2-tcti-mssim.so.0");
//! factory.set_library_conf("host=localhost,port=2321");
//! let mut tcti = factory.build()?;
//! tcti.transmit(&command)?;
//! ```
//!
//! # Module Overview
//!
//! - [`transport`]: kind table, configuration, factory and backends
//! - [`source`]: Source/Sink capabilities
//! - [`config`]: TOML file, environment and CLI layering

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod source;
pub mod transport;

// Re-exports for convenience
pub use source::{add_sink, Component, FanOutSource, Sink, Source};
pub use transport::{
    kind_from_name, BackendError, LoadError, Transport, TransportConfig, TransportError,
    TransportFactory, TransportKind, TransportSink, UnknownKindError,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, BrokerConfig, ConfigError,
    ConfigOverrides, ConfigSource,
};
