use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::agent::UnknownToolPolicy;

#[derive(Parser, Debug)]
#[command(name = "calmate", version, about = "Conversational calendar assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authorize against Google Calendar and start a chat session
    Run {
        /// Model name (e.g., "gemini-2.0-flash", "gpt-4o-mini")
        #[arg(short, long)]
        model: Option<String>,

        /// OAuth client credentials file downloaded from the Google console
        #[arg(long)]
        credentials: Option<PathBuf>,

        /// Local port for the OAuth redirect
        #[arg(short, long)]
        port: Option<u16>,

        /// What to do when the model calls a tool that does not exist
        #[arg(long, value_name = "report|abort")]
        unknown_tool: Option<UnknownToolPolicy>,

        /// Path to config file (overrides default search)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the tools offered to the model
    Tools {
        /// Path to config file (overrides default search)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Serve the clock tool over MCP (streamable HTTP at /mcp)
    Mcp {
        /// Port to listen on (default 8080)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to config file (overrides default search)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
