use clap::{Parser, Subcommand};

/// Returns the version string, including git hash and commit date for non-release builds.
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "costwise", version = get_version())]
#[command(about = "Construction cost-estimation workbook for the command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Use the user-wide store instead of the project-local .costwise/
    #[arg(short, long, global = true)]
    pub global: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the module tree
    #[command(alias = "ls")]
    Modules {
        /// Filter modules by name (ancestor headers stay visible)
        #[arg(short, long)]
        search: Option<String>,

        /// Expand all headers
        #[arg(short, long)]
        all: bool,
    },

    /// Add a module
    Add {
        /// Display name (the id is derived from it)
        name: String,

        /// Create a grouping header instead of a regular module
        #[arg(long)]
        header: bool,

        /// Parent header id for a regular module
        #[arg(short, long)]
        parent: Option<String>,

        /// The module can be opened without an active client
        #[arg(long)]
        no_client: bool,
    },

    /// Rename a module
    Rename {
        /// Module id
        id: String,

        /// New display name
        name: String,
    },

    /// Delete a module and everything under it
    #[command(alias = "rm")]
    Delete {
        /// Module id
        id: String,
    },

    /// Move a module relative to another (reorder or re-parent)
    #[command(alias = "mv")]
    Move {
        /// Module id to move
        id: String,

        /// Drop target id
        target: String,

        /// Where it lands: top, into (headers only) or bottom
        #[arg(default_value = "bottom")]
        position: String,
    },

    /// List known clients
    Clients,

    /// Create a client and make it current
    #[command(name = "client-new")]
    ClientNew {
        name: String,

        #[arg(default_value = "")]
        address: String,
    },

    /// Make a client current
    #[command(name = "client-use")]
    ClientUse {
        /// Client id (client-<timestamp>)
        id: String,
    },

    /// Show the current client
    #[command(name = "client-show")]
    ClientShow,

    /// Clear the current client
    #[command(name = "client-clear")]
    ClientClear,

    /// Record a module's total cost for the current client
    #[command(name = "set-cost")]
    SetCost {
        /// Module id
        module: String,

        /// Total cost
        total: f64,
    },

    /// Show cost tiles and the grand total for the current client
    #[command(alias = "d")]
    Dashboard,

    /// Get or set configuration
    Config {
        /// Configuration key (e.g., batch-idle-secs)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}
