//! Command-line definitions for the helper.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Registers schemes on behalf of a Hermes host and forwards activations.
#[derive(Parser, Debug)]
#[command(name = "hermes-urls", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Logs progress at info level.
    #[arg(long, global = true)]
    pub(crate) verbose: bool,
    /// Logs diagnostics at debug level.
    #[arg(long, global = true)]
    pub(crate) debug: bool,
    /// Reads configuration from this TOML file.
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) config_path: Option<Utf8PathBuf>,
    #[command(subcommand)]
    pub(crate) command: HelperCommand,
}

impl Cli {
    /// Filter applied to the helper's log output.
    pub(crate) fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum HelperCommand {
    /// Associates a scheme with the command line that handles it.
    Register {
        /// Logs at debug level whenever the scheme is activated.
        #[arg(long)]
        register_with_debugging: bool,
        /// Scheme to associate.
        scheme: String,
        /// Program and arguments; `%1` is replaced by the activated path.
        #[arg(
            value_name = "COMMAND",
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        command: Vec<String>,
    },
    /// Removes the association for a scheme.
    Unregister {
        /// Scheme to forget.
        scheme: String,
    },
    /// Delivers a URL to the host that owns its scheme.
    Open {
        /// URL such as `hue4://content/Game/Map?edit`.
        url: String,
    },
}
