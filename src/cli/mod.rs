//! `tgsearch search` prints message hits as soon as they arrive and fills in
//! sender names afterwards; `users` and `avatar` expose the identity and
//! avatar lookups on their own, `init` writes a starter config.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// tgsearch - search indexed Telegram chat messages
#[derive(Parser)]
#[command(name = "tgsearch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search paths
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search messages in a group
    #[command(alias = "s")]
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
        /// Web id of the group to search in
        #[arg(long)]
        ins_id: i64,
        /// Result page, starting at 1
        #[arg(long, default_value = "1")]
        page: i64,
        /// Page size
        #[arg(long)]
        limit: Option<i64>,
        /// How long to wait for sender names after the hits are shown
        #[arg(long, default_value = "5")]
        wait_secs: u64,
    },

    /// Look up display names for user ids
    #[command(alias = "u")]
    Users {
        #[arg(required = true, allow_negative_numbers = true)]
        ids: Vec<i64>,
    },

    /// Print a user's avatar URL, or download it
    Avatar {
        id: i64,
        /// Write the image here instead of printing the URL
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_arguments() {
        let cli = Cli::parse_from(["tgsearch", "search", "测试", "火星", "--ins-id", "1"]);
        match cli.command {
            Commands::Search {
                query,
                ins_id,
                page,
                limit,
                wait_secs,
            } => {
                assert_eq!(query, vec!["测试", "火星"]);
                assert_eq!(ins_id, 1);
                assert_eq!(page, 1);
                assert_eq!(limit, None);
                assert_eq!(wait_secs, 5);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn users_accepts_negative_ids() {
        let cli = Cli::parse_from(["tgsearch", "users", "10001", "-100"]);
        assert!(matches!(cli.command, Commands::Users { ids } if ids == vec![10001, -100]));
    }
}
