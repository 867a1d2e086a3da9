use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Requirements traceability and machine telemetry dashboard")]
pub struct Cli {
    /// Base URL of the requirements API (overrides the config file)
    #[clap(long, global = true)]
    pub api_url: Option<String>,

    /// Path to the config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatrixFormat {
    Table,
    Markdown,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the requirements traceability matrix
    Matrix {
        /// Read requirements and use cases from a dataset file instead of the API
        #[clap(long)]
        file: Option<PathBuf>,

        /// Output format
        #[clap(long, value_enum, default_value = "table")]
        format: MatrixFormat,

        /// Write to this file instead of stdout (format inferred from extension unless given)
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List requirements
    List {
        /// Filter by status (draft, review, approved, implemented, verified, rejected)
        #[clap(long)]
        status: Option<String>,

        /// Filter by priority (1-5)
        #[clap(long)]
        priority: Option<u8>,

        /// Filter by type (functional, non-functional, business, technical, security, performance, usability)
        #[clap(long)]
        r#type: Option<String>,

        /// Filter by title (case-insensitive substring)
        #[clap(long)]
        title: Option<String>,

        /// Read from a dataset file instead of the API
        #[clap(long)]
        file: Option<PathBuf>,
    },

    /// Submit a new requirement
    Add {
        #[clap(long)]
        title: Option<String>,

        #[clap(long)]
        description: Option<String>,

        /// Requirement type (functional, non-functional, business, technical, security, performance, usability)
        #[clap(long)]
        r#type: Option<String>,

        /// Priority from 1 (highest) to 5 (lowest)
        #[clap(long)]
        priority: Option<String>,

        /// Acceptance criterion (repeat for several)
        #[clap(long = "criterion")]
        criteria: Vec<String>,

        /// Comma-separated stakeholder names
        #[clap(long)]
        stakeholders: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long, short = 'i')]
        interactive: bool,
    },

    /// Submit a new use case
    AddUseCase {
        #[clap(long)]
        title: String,

        #[clap(long)]
        description: String,

        #[clap(long)]
        actor: String,

        /// Main flow step, e.g. "1. Operator opens the matrix" (repeat for several)
        #[clap(long = "step", required = true)]
        steps: Vec<String>,

        /// Requirement id this use case covers (repeat for several)
        #[clap(long = "requirement")]
        requirements: Vec<String>,

        #[clap(long, default_value_t = 3)]
        priority: u8,
    },

    /// Show the use cases and dependencies traced to one requirement
    Trace {
        /// Requirement id
        id: String,
    },

    /// Save the API's requirements and use cases to a dataset file
    Fetch {
        /// Output file (.yaml or .json)
        #[clap(long, short = 'o')]
        output: PathBuf,
    },

    /// Run the live machine telemetry dashboard
    Dashboard {
        /// Machine to monitor
        #[clap(long)]
        machine: Option<String>,

        /// Host (and port) serving the telemetry socket
        #[clap(long)]
        host: Option<String>,

        /// Use wss://
        #[clap(long)]
        secure: bool,

        /// Start offline: show the cached snapshot without connecting
        #[clap(long)]
        offline: bool,
    },

    /// Configuration commands
    #[clap(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the path to the config file
    Path,

    /// Write the effective configuration to the config file
    Init,
}
