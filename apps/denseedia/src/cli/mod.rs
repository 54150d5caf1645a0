//! # DenseEdia CLI Module
//!
//! Command-line access to the knowledge base.
//!
//! ## Available Commands
//!
//! - `add` - Create a node, optionally with `url`/`comment` elements
//! - `list` - List all nodes
//! - `show` - Display a node, its current values and its links
//! - `set` - Record a new value for an element
//! - `edit` - Change a node's title or kind
//! - `delete` - Delete a node and all its history
//! - `history` - Show every version of an element
//! - `link` - Create, show, edit or delete links
//! - `most-used` - Most frequent element names for a node kind
//! - `status` - Row counts of the store
//! - `export` - Dump the whole store as JSON
//! - `init` - Create a new empty database
//! - `server` - Start the HTTP server

mod commands;

use crate::config::Config;
use clap::{ArgAction, Parser, Subcommand};
use denseedia_core::DenseError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// DenseEdia - personal knowledge base
///
/// Nodes carry named, typed attributes whose every past value is kept.
#[derive(Parser, Debug)]
#[command(name = "denseedia")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress the server banner
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database [default: denseedia.redb]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// TOML config file [default: ./denseedia.toml if present]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new node
    Add {
        /// Title words, joined with spaces
        title: Vec<String>,

        /// Kind of the node (book, movie, ...)
        #[arg(short, long)]
        kind: Option<String>,

        /// URL, stored as the `url` element (and used as title if none given)
        #[arg(short, long)]
        url: Option<String>,

        /// Comment, stored as the `comment` element
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// List all nodes
    List,

    /// Display a node with its current values and links
    Show {
        /// Node ID
        id: u64,
    },

    /// Record a new value for an element, creating it if needed
    Set {
        /// Node ID
        id: u64,

        /// Element name
        name: String,

        /// New value
        value: String,

        /// Value type (none, bool, int, float, str, datetime)
        #[arg(short = 't', long = "type", default_value = "str")]
        value_type: String,

        /// Allow a type different from the current value's
        #[arg(short = 'y', long)]
        allow_type_change: bool,
    },

    /// Change a node's title or kind
    Edit {
        /// Node ID
        id: u64,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New kind
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Delete a node, its elements, their history and its links
    Delete {
        /// Node ID
        id: u64,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show the history of an element
    History {
        /// Node ID
        id: u64,

        /// Element name
        name: String,
    },

    /// Operations on links
    Link {
        #[command(subcommand)]
        action: LinkCommand,
    },

    /// Most frequent element names among nodes of a kind
    MostUsed {
        /// Node kind
        kind: String,

        /// Number of names to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Show store status
    Status,

    /// Export the whole store as JSON
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Start HTTP server
    Server {
        /// Host to bind to [default: 127.0.0.1]
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to [default: 8080]
        #[arg(short, long)]
        port: Option<u16>,

        /// Serve a volatile in-memory store instead of the database
        #[arg(long)]
        ephemeral: bool,
    },
}

/// Link subcommands.
#[derive(Subcommand, Debug)]
pub enum LinkCommand {
    /// Link two nodes
    Add {
        /// Source node ID
        from: u64,

        /// Target node ID
        to: u64,

        /// Label of the link
        #[arg(short, long)]
        label: Option<String>,

        /// Create an undirected link
        #[arg(long)]
        undirected: bool,
    },

    /// Display a link
    Show {
        /// Link ID
        id: u64,
    },

    /// Edit a link
    Edit {
        /// Link ID
        id: u64,

        /// New label
        #[arg(short, long, conflicts_with = "clear_label")]
        label: Option<String>,

        /// Remove the label
        #[arg(long)]
        clear_label: bool,

        /// Make the link directed (true) or undirected (false)
        #[arg(long)]
        directed: Option<bool>,
    },

    /// Delete a link
    Delete {
        /// Link ID
        id: u64,
    },
}

impl Cli {
    /// Whether the command runs the HTTP server.
    pub fn is_server(&self) -> bool {
        matches!(self.command, Some(Commands::Server { .. }))
    }

    /// Load the layered config and apply the command-line overrides.
    pub fn resolve_config(&self) -> Result<Config, DenseError> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(db) = &self.database {
            config.database.clone_from(db);
        }
        if let Some(Commands::Server { host, port, .. }) = &self.command {
            if let Some(host) = host {
                config.server.host.clone_from(host);
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
        Ok(config)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and resolved settings.
pub async fn execute(cli: Cli, config: Config) -> Result<(), DenseError> {
    let db = config.database.as_path();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Add {
            title,
            kind,
            url,
            comment,
        }) => cmd_add(db, json_mode, &title, kind, url, comment),
        Some(Commands::List) => cmd_list(db, json_mode),
        Some(Commands::Show { id }) => cmd_show(db, json_mode, id),
        Some(Commands::Set {
            id,
            name,
            value,
            value_type,
            allow_type_change,
        }) => cmd_set(
            db,
            json_mode,
            id,
            &name,
            &value,
            &value_type,
            allow_type_change,
        ),
        Some(Commands::Edit { id, title, kind }) => cmd_edit(db, json_mode, id, title, kind),
        Some(Commands::Delete { id, yes }) => cmd_delete(db, json_mode, id, yes),
        Some(Commands::History { id, name }) => cmd_history(db, json_mode, id, &name),
        Some(Commands::Link { action }) => cmd_link(db, json_mode, action),
        Some(Commands::MostUsed { kind, limit }) => cmd_most_used(db, json_mode, &kind, limit),
        Some(Commands::Export { output }) => cmd_export(db, &output),
        Some(Commands::Init { force }) => cmd_init(db, force),
        Some(Commands::Server { ephemeral, .. }) => cmd_server(&config, ephemeral, cli.quiet).await,
        Some(Commands::Status) | None => cmd_status(db, json_mode),
    }
}

/// Extra guidance printed after an error.
pub fn hint(err: &DenseError) -> Option<&'static str> {
    match err {
        DenseError::ValueTypeChange { .. } => Some("use --type or --allow-type-change"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn set_defaults_to_str() {
        let cli = Cli::try_parse_from(["denseedia", "set", "1", "rating", "5"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Set {
                ref value_type,
                allow_type_change: false,
                ..
            }) if value_type == "str"
        ));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["denseedia", "list", "-vv", "-D", "kb.redb", "--json-mode"])
            .expect("parse");
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.database, Some(PathBuf::from("kb.redb")));
        assert!(cli.json_mode);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from(["denseedia", "-D", "cli.redb", "server", "-p", "9999"])
            .expect("parse");
        let config = cli.resolve_config().expect("config");
        assert_eq!(config.database, PathBuf::from("cli.redb"));
        assert_eq!(config.server.port, 9999);
        assert!(cli.is_server());
    }

    #[test]
    fn type_change_has_hint() {
        let err = DenseError::ValueTypeChange {
            old: denseedia_core::ValueKind::Int,
            new: denseedia_core::ValueKind::String,
        };
        assert_eq!(hint(&err), Some("use --type or --allow-type-change"));
        assert!(hint(&DenseError::InvalidInput(String::new())).is_none());
    }
}
