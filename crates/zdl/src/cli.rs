//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use zdl_types::Specifier;

/// zdl - Zig toolchain download manager
#[derive(Parser, Debug)]
#[command(name = "zdl")]
#[command(
    version,
    about = "Download, switch between and clean up Zig toolchains",
    after_help = "Without a subcommand, zdl activates master. \
                  Other versions go through `zdl activate <VERSION>`."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Installation root, overriding the configured one
    #[arg(long, global = true, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Release index platform key, e.g. `aarch64-macos`
    #[arg(long, global = true, value_name = "KEY")]
    pub platform: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Install a version if needed and make it the active one (default)
    Activate {
        /// `master`, `stable`, a version id, or an index into installed versions
        #[arg(allow_negative_numbers = true, value_name = "VERSION")]
        spec: Option<String>,
    },

    /// List installed versions
    List {
        /// Only show the version this resolves to
        #[arg(allow_negative_numbers = true, value_name = "VERSION")]
        spec: Option<String>,
    },

    /// Protect an installed version from garbage collection
    Pin {
        #[arg(allow_negative_numbers = true, value_name = "VERSION")]
        spec: String,
    },

    /// Remove the garbage-collection protection from a version
    Unpin {
        #[arg(allow_negative_numbers = true, value_name = "VERSION")]
        spec: String,
    },

    /// Remove every version that is neither active nor pinned
    Gc,

    /// Show the effective configuration
    Config,
}

impl Command {
    /// The version specifier the command operates on, if it takes one.
    #[must_use]
    pub fn specifier(&self) -> Option<Specifier> {
        match self {
            Self::Activate { spec } => Some(Specifier::parse(spec.as_deref())),
            Self::List { spec } => spec.as_deref().map(|s| Specifier::parse(Some(s))),
            Self::Pin { spec } | Self::Unpin { spec } => Some(Specifier::parse(Some(spec))),
            Self::Gc | Self::Config => None,
        }
    }
}

impl Cli {
    /// The subcommand to run; no subcommand means activating `master`.
    #[must_use]
    pub fn command(&self) -> &Command {
        static DEFAULT: Command = Command::Activate { spec: None };
        self.command.as_ref().unwrap_or(&DEFAULT)
    }
}
