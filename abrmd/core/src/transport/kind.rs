//! TCTI Kinds
//!
//! The closed set of downstream transports the broker can be built with, and
//! the name table used to select one from the command line or a config file.
//!
//! Optional kinds are gated by the same cargo feature in both the enum and the
//! table, so the two cannot drift apart under any feature combination.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Downstream transport selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Inert placeholder; building it is always an error
    None,

    /// Character device node (e.g. `/dev/tpm0`)
    #[cfg(feature = "device")]
    Device,

    /// TCP connection to a TPM simulator
    #[cfg(feature = "socket")]
    Socket,

    /// TSS2 TCTI shared library loaded at runtime
    #[default]
    Dynamic,
}

/// One row of the kind name table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NameKindEntry {
    /// Human-readable name accepted by `--tcti`
    pub name: &'static str,
    /// Kind selected by that name
    pub kind: TransportKind,
}

/// Name table for every kind compiled into this build, in display order
pub const KIND_TABLE: &[NameKindEntry] = &[
    NameKindEntry {
        name: "none",
        kind: TransportKind::None,
    },
    #[cfg(feature = "device")]
    NameKindEntry {
        name: "device",
        kind: TransportKind::Device,
    },
    #[cfg(feature = "socket")]
    NameKindEntry {
        name: "socket",
        kind: TransportKind::Socket,
    },
    NameKindEntry {
        name: "dynamic",
        kind: TransportKind::Dynamic,
    },
];

/// The given name matches no compiled-in kind
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown TCTI: {name}")]
pub struct UnknownKindError {
    /// The rejected name, verbatim
    pub name: String,
}

/// Look up a kind by its exact (case-sensitive) table name
///
/// # Errors
///
/// Returns [`UnknownKindError`] if no compiled-in entry carries `name`.
pub fn kind_from_name(name: &str) -> Result<TransportKind, UnknownKindError> {
    KIND_TABLE
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.kind)
        .ok_or_else(|| UnknownKindError {
            name: name.to_string(),
        })
}

impl TransportKind {
    /// Table name of this kind
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            #[cfg(feature = "device")]
            Self::Device => "device",
            #[cfg(feature = "socket")]
            Self::Socket => "socket",
            Self::Dynamic => "dynamic",
        }
    }

    /// Every kind compiled into this build, in table order
    pub fn all() -> impl Iterator<Item = Self> {
        KIND_TABLE.iter().map(|entry| entry.kind)
    }

    /// Names joined the way `--help` shows them, e.g. `none | device | dynamic`
    #[must_use]
    pub fn names_help() -> String {
        KIND_TABLE
            .iter()
            .map(|entry| entry.name)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for TransportKind {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        kind_from_name(s)
    }
}
