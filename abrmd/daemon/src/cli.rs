//! Command-Line Binding
//!
//! The daemon's own flags come from [`Args`](crate::Args); the TCTI flags are
//! generated from the core's option table so they always match the kinds
//! compiled into this build.

use clap::builder::TypedValueParser;
use clap::parser::ValueSource;
use clap::{Arg, ArgMatches, Command, CommandFactory};

use abrmd_core::transport::{kind_from_name, OptionEntry, OptionValueKind, TransportFactory};
use abrmd_core::ConfigOverrides;

use crate::Args;

/// Full command: daemon flags plus the TCTI option group
pub fn command() -> Command {
    let group = TransportFactory::option_group();
    Args::command()
        .next_help_heading(group.description)
        .args(group.entries.into_iter().map(tcti_arg))
}

fn tcti_arg(entry: OptionEntry) -> Arg {
    let arg = Arg::new(entry.long)
        .long(entry.long)
        .short(entry.short)
        .help(entry.description)
        .value_name(entry.arg_description)
        .default_value(entry.default);

    match entry.value_kind {
        OptionValueKind::KindName => {
            arg.value_parser(|s: &str| kind_from_name(s).map(|_| s.to_string()))
        }
        OptionValueKind::Port => arg.value_parser(clap::value_parser!(u16).map(|p| p.to_string())),
        OptionValueKind::Path | OptionValueKind::String => {
            arg.value_parser(clap::value_parser!(String))
        }
    }
}

/// TCTI values given explicitly on the command line
///
/// Defaults are left out so they do not mask the config file or environment.
pub fn tcti_overrides(matches: &ArgMatches) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    for entry in TransportFactory::option_group().entries {
        if matches.value_source(entry.long) != Some(ValueSource::CommandLine) {
            continue;
        }
        if let Some(value) = matches.get_one::<String>(entry.long) {
            overrides.push(entry.long, value.clone());
        }
    }
    overrides
}
