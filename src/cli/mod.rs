pub mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::scheduler::{SchedulerConfig, DEFAULT_CONCURRENCY};

#[derive(Parser, Debug)]
#[command(name = "gator")]
#[command(about = "A multi-user RSS/Atom feed aggregator", long_about = None, version)]
pub struct Cli {
    /// Path to the config file (default: ~/.gatorconfig.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create a user and log in as them
    Register {
        /// Unique user name
        name: String,
    },
    /// Switch the current user
    Login {
        /// Existing user name
        name: String,
    },
    /// Delete all users, feeds, follows and posts
    Reset,
    /// List registered users
    Users,
    /// Poll feeds on a fixed interval and store new posts
    Agg {
        /// Time between polls (e.g. "30s", "1m", "1h")
        #[arg(default_value = "1m", value_parser = SchedulerConfig::parse_interval)]
        interval: Duration,

        /// Feeds fetched in parallel per poll
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// Timeout for a single feed request
        #[arg(short, long, default_value = "10s", value_parser = SchedulerConfig::parse_interval)]
        timeout: Duration,

        /// Run a single poll and exit
        #[arg(long)]
        once: bool,
    },
    /// Add a feed and follow it
    #[command(name = "addfeed")]
    AddFeed {
        /// Display name of the feed
        name: String,
        /// URL of the RSS/Atom document
        url: String,
    },
    /// Remove a feed you added, with its follows and posts
    #[command(name = "removefeed")]
    RemoveFeed {
        /// URL of the feed to remove
        url: String,
    },
    /// List all feeds
    Feeds,
    /// Follow an existing feed
    Follow {
        /// URL of the feed to follow
        url: String,
    },
    /// List the feeds you follow
    Following,
    /// Stop following a feed
    Unfollow {
        /// URL of the feed to unfollow
        url: String,
    },
    /// Show the newest posts from the feeds you follow
    Browse {
        /// Number of posts to show
        #[arg(default_value_t = 2)]
        limit: usize,
    },
}

impl Commands {
    /// Whether the command acts on behalf of the current user.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Commands::AddFeed { .. }
                | Commands::RemoveFeed { .. }
                | Commands::Follow { .. }
                | Commands::Following
                | Commands::Unfollow { .. }
                | Commands::Browse { .. }
        )
    }
}
