use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "chatsync", about = "Chat message sync client (CLI)")]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Acting user id; overrides [session] user_id from the config file
    #[arg(long, global = true)]
    pub user_id: Option<String>,

    /// Access token; overrides [session] access_token from the config file
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Open a chat and keep it synchronized
    Open {
        /// Id of the chat to open
        chat_id: String,
    },
}
