#[derive(clap::Parser, Debug)]
#[command(name = "toolkit")]
#[command(about = "Browse, install and uninstall developer toolkit modules")]
#[command(version)]
pub struct Cli {
    /// Override the configured API url for this invocation
    #[clap(long, global = true)]
    pub api_url: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Browse the module catalog
    Modules {
        #[clap(subcommand)]
        command: ModuleCommands,
    },
    /// Install a module by id
    Install { id: i64 },
    /// Uninstall a module by id
    Uninstall { id: i64 },
    /// List installed modules
    Installed,
    /// Sign in
    Login {
        username: String,
        /// Read from stdin when omitted
        #[clap(long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        username: String,
        email: String,
        /// Read from stdin when omitted
        #[clap(long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Manage configuration
    Config {
        #[clap(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ModuleCommands {
    /// List modules, most downloaded first
    List {
        /// Only modules in this category (e.g. "CSS", "C++", "Node.js")
        #[clap(long)]
        category: Option<String>,
    },
    /// Search by name, description or tag
    Search { query: String },
    /// Show a module including its content
    Show { id: i64 },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigCommands {
    /// Set a configuration value
    Set { key: String, value: String },
    /// Get a configuration value
    Get { key: String },
    /// Show all configuration
    Show,
    /// Reset configuration to defaults
    Reset {
        /// Skip the confirmation prompt
        #[clap(long)]
        force: bool,
    },
}
