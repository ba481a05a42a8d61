//! TCTI Command-Line Options
//!
//! The option table a CLI layer binds against, and the callback that applies a
//! parsed value to a [`TransportFactory`]. Only options for compiled-in kinds
//! appear in the table.

use thiserror::Error;

use super::config::{TransportField, DEFAULT_LIBRARY_CONF, DEFAULT_LIBRARY_NAME};
use super::factory::TransportFactory;
use super::kind::{TransportKind, UnknownKindError};

/// `--tcti`
pub const OPT_TCTI: &str = "tcti";
/// `--tcti-device`
#[cfg(feature = "device")]
pub const OPT_DEVICE: &str = "tcti-device";
/// `--tcti-socket-address`
#[cfg(feature = "socket")]
pub const OPT_SOCKET_ADDRESS: &str = "tcti-socket-address";
/// `--tcti-socket-port`
#[cfg(feature = "socket")]
pub const OPT_SOCKET_PORT: &str = "tcti-socket-port";
/// `--tcti-file-name`
pub const OPT_FILE_NAME: &str = "tcti-file-name";
/// `--tcti-conf-str`
pub const OPT_CONF_STR: &str = "tcti-conf-str";

/// How an option's argument is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionValueKind {
    /// A kind name from the name table
    KindName,
    /// A filesystem path
    Path,
    /// An arbitrary string
    String,
    /// A TCP port, 0-65535
    Port,
}

/// One bindable option
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionEntry {
    /// Long flag without leading dashes
    pub long: &'static str,
    /// Short flag
    pub short: char,
    /// Argument interpretation
    pub value_kind: OptionValueKind,
    /// Help text
    pub description: &'static str,
    /// Placeholder shown for the argument in help output
    pub arg_description: String,
    /// Default value, as the CLI would spell it
    pub default: String,
}

/// A named group of options, shown under its own help heading
#[derive(Clone, Debug)]
pub struct OptionGroup {
    /// Group identifier
    pub name: &'static str,
    /// Help heading
    pub description: &'static str,
    /// Entries in display order
    pub entries: Vec<OptionEntry>,
}

/// Errors from applying a parsed option
#[derive(Debug, Error)]
pub enum OptionError {
    /// `--tcti` named a kind that is not compiled in
    #[error(transparent)]
    UnknownKind(#[from] UnknownKindError),

    /// The argument could not be interpreted
    #[error("invalid value '{value}' for --{option}: expected {expected}")]
    InvalidValue {
        /// Option long name
        option: &'static str,
        /// Rejected argument
        value: String,
        /// What was expected instead
        expected: &'static str,
    },

    /// No such option in this build
    #[error("unknown TCTI option: --{0}")]
    UnknownOption(String),
}

impl TransportFactory {
    /// Option table for the compiled-in kinds
    #[must_use]
    pub fn option_group() -> OptionGroup {
        let mut entries = vec![OptionEntry {
            long: OPT_TCTI,
            short: 't',
            value_kind: OptionValueKind::KindName,
            description: "Downstream TCTI",
            arg_description: format!("[ {} ]", TransportKind::names_help()),
            default: TransportKind::default().name().to_string(),
        }];

        #[cfg(feature = "device")]
        entries.push(OptionEntry {
            long: OPT_DEVICE,
            short: 'd',
            value_kind: OptionValueKind::Path,
            description: "TPM2 device node",
            arg_description: super::config::DEFAULT_DEVICE_PATH.to_string(),
            default: super::config::DEFAULT_DEVICE_PATH.to_string(),
        });

        #[cfg(feature = "socket")]
        {
            entries.push(OptionEntry {
                long: OPT_SOCKET_ADDRESS,
                short: 'a',
                value_kind: OptionValueKind::String,
                description: "Address for socket TCTI",
                arg_description: super::config::DEFAULT_SOCKET_ADDRESS.to_string(),
                default: super::config::DEFAULT_SOCKET_ADDRESS.to_string(),
            });
            entries.push(OptionEntry {
                long: OPT_SOCKET_PORT,
                short: 'p',
                value_kind: OptionValueKind::Port,
                description: "Port for socket TCTI",
                arg_description: "0-65535".to_string(),
                default: super::config::DEFAULT_SOCKET_PORT.to_string(),
            });
        }

        entries.push(OptionEntry {
            long: OPT_FILE_NAME,
            short: 'i',
            value_kind: OptionValueKind::String,
            description: "Name of TCTI library. See dlopen(3) for search rules.",
            arg_description: "file-name".to_string(),
            default: DEFAULT_LIBRARY_NAME.to_string(),
        });
        entries.push(OptionEntry {
            long: OPT_CONF_STR,
            short: 'j',
            value_kind: OptionValueKind::String,
            description: "Configuration string passed to TCTI at time of initialization.",
            arg_description: "tcti-conf-str".to_string(),
            default: DEFAULT_LIBRARY_CONF.to_string(),
        });

        OptionGroup {
            name: "tcti",
            description: "TCTI Options",
            entries,
        }
    }

    /// Apply one parsed option by its long name
    ///
    /// An unrecognized `--tcti` value leaves the selected kind unchanged.
    ///
    /// # Errors
    ///
    /// See [`OptionError`].
    pub fn apply_option(&mut self, long: &str, value: &str) -> Result<(), OptionError> {
        match long {
            OPT_TCTI => self.set_kind_by_name(value)?,
            #[cfg(feature = "device")]
            OPT_DEVICE => self.set_field(TransportField::DevicePath(value.to_string())),
            #[cfg(feature = "socket")]
            OPT_SOCKET_ADDRESS => self.set_field(TransportField::SocketAddress(value.to_string())),
            #[cfg(feature = "socket")]
            OPT_SOCKET_PORT => {
                let port = value.parse().map_err(|_| OptionError::InvalidValue {
                    option: OPT_SOCKET_PORT,
                    value: value.to_string(),
                    expected: "a port number in 0-65535",
                })?;
                self.set_field(TransportField::SocketPort(port));
            }
            OPT_FILE_NAME => self.set_field(TransportField::LibraryName(value.to_string())),
            OPT_CONF_STR => self.set_field(TransportField::LibraryConf(value.to_string())),
            other => return Err(OptionError::UnknownOption(other.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_table_has_unique_flags() {
        let group = TransportFactory::option_group();
        let longs: HashSet<_> = group.entries.iter().map(|e| e.long).collect();
        let shorts: HashSet<_> = group.entries.iter().map(|e| e.short).collect();
        assert_eq!(longs.len(), group.entries.len());
        assert_eq!(shorts.len(), group.entries.len());
    }

    #[test]
    fn test_table_follows_features() {
        let group = TransportFactory::option_group();
        let has = |long: &str| group.entries.iter().any(|e| e.long == long);

        assert!(has("tcti"));
        assert!(has("tcti-file-name"));
        assert!(has("tcti-conf-str"));
        assert_eq!(has("tcti-device"), cfg!(feature = "device"));
        assert_eq!(has("tcti-socket-address"), cfg!(feature = "socket"));
        assert_eq!(has("tcti-socket-port"), cfg!(feature = "socket"));
    }

    #[test]
    fn test_tcti_arg_description_lists_compiled_kinds() {
        let group = TransportFactory::option_group();
        let tcti = &group.entries[0];
        assert_eq!(tcti.long, "tcti");
        assert_eq!(tcti.short, 't');
        assert_eq!(tcti.default, "dynamic");
        for kind in TransportKind::all() {
            assert!(tcti.arg_description.contains(kind.name()));
        }
    }

    #[test]
    fn test_every_entry_is_applicable() {
        for entry in TransportFactory::option_group().entries {
            let mut factory = TransportFactory::new();
            factory
                .apply_option(entry.long, &entry.default)
                .unwrap_or_else(|e| panic!("default for --{} rejected: {e}", entry.long));
        }
    }

    #[test]
    fn test_apply_tcti_rejects_unknown_name() {
        let mut factory = TransportFactory::new();
        factory.apply_option("tcti", "none").unwrap();

        let err = factory.apply_option("tcti", "tabrmd").unwrap_err();
        assert_eq!(err.to_string(), "unknown TCTI: tabrmd");
        assert_eq!(factory.kind(), TransportKind::None);
    }

    #[test]
    fn test_apply_string_fields() {
        let mut factory = TransportFactory::new();
        factory
            .apply_option("tcti-file-name", "libtss2-tcti-swtpm.so.0")
            .unwrap();
        factory.apply_option("tcti-conf-str", "port=2321").unwrap();

        assert_eq!(
            factory.config().library_name.as_deref(),
            Some("libtss2-tcti-swtpm.so.0")
        );
        assert_eq!(factory.config().library_conf.as_deref(), Some("port=2321"));
    }

    #[cfg(feature = "socket")]
    #[test]
    fn test_apply_port_validates_range() {
        let mut factory = TransportFactory::new();
        factory.apply_option("tcti-socket-port", "65535").unwrap();
        assert_eq!(factory.config().socket_port, Some(65535));

        for bad in ["65536", "-1", "port"] {
            let err = factory.apply_option("tcti-socket-port", bad).unwrap_err();
            assert!(matches!(err, OptionError::InvalidValue { .. }));
        }
        assert_eq!(factory.config().socket_port, Some(65535));
    }

    #[test]
    fn test_apply_unknown_option() {
        let mut factory = TransportFactory::new();
        let err = factory.apply_option("tcti-bogus", "x").unwrap_err();
        assert_eq!(err.to_string(), "unknown TCTI option: --tcti-bogus");
    }
}
