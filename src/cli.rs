use clap::{Parser, Subcommand};

/// Terminal client for the console's AI assistant
#[derive(Debug, Parser)]
#[command(name = "agno-chat")]
#[command(version)]
#[command(about = "Chat with console assistants from the terminal", long_about = None)]
pub struct Args {
    /// API base URL including the version path (default: config, $AGNO_BASE_API or http://127.0.0.1:9999/api/v1)
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Conversation to chat in (used when no subcommand is given)
    #[arg(short = 'c', long = "conversation")]
    pub conversation: Option<u64>,

    /// Print raw JSON records instead of the answer text
    #[arg(long = "raw")]
    pub raw: bool,

    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Message text (positional) (used when no subcommand is given)
    #[arg(value_name = "MESSAGE")]
    pub prompt: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Obtain an access token and cache it under state
    Login {
        #[arg(short = 'u', long = "username")]
        username: String,
        /// Password (prompted on stdin when omitted)
        #[arg(short = 'p', long = "password")]
        password: Option<String>,
    },

    /// List conversations
    Conversations {
        /// Only conversations of this assistant
        #[arg(long = "assistant")]
        assistant: Option<u64>,
        #[arg(long = "page", default_value_t = 1)]
        page: u32,
        #[arg(long = "page-size", default_value_t = 10)]
        page_size: u32,
    },

    /// Create a conversation with an assistant
    New {
        assistant: u64,
        #[arg(long = "title")]
        title: Option<String>,
    },

    /// Change the title of a conversation
    Rename { conversation: u64, title: String },

    /// Delete a conversation and its messages
    Delete { conversation: u64 },

    /// Print the message history of a conversation
    Messages { conversation: u64 },

    /// Send a message without streaming and print the reply
    Send {
        conversation: u64,
        /// Message text
        message: Vec<String>,
    },
}
