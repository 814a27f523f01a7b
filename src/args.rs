//! These structs provide the CLI interface for the spendsync CLI.

use crate::home::default_home;
use crate::model::{Category, Currency};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

/// spendsync: a command-line spending tracker synchronized with a remote
/// transaction feed.
///
/// Transactions are downloaded from the configured endpoint with bounded,
/// randomized retries and cached locally, so browsing and editing keep
/// working while the network is unreachable. Local edits are written through
/// to the cache immediately.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List transactions, newest first, optionally filtered.
    List(ListArgs),
    /// Create a new transaction and save it.
    Add(AddArgs),
    /// Delete the transaction with the given id.
    Delete(DeleteArgs),
    /// Drop the local cache and re-download the transaction list.
    Clear,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the configuration and the cached transaction data
    /// are held. Defaults to the platform data directory.
    #[arg(long, env = "SPENDING_SYNC_HOME", default_value_t = DisplayPath(default_home()))]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// Args for the `spendsync list` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct ListArgs {
    /// Show only transactions whose summary contains this text
    /// (case-insensitive) or whose amount text contains it.
    #[arg(long)]
    filter: Option<String>,
}

impl ListArgs {
    pub fn filter(&self) -> &str {
        self.filter.as_deref().unwrap_or_default()
    }
}

/// Args for the `spendsync add` command. Defaults mirror the mobile app's
/// new-transaction form: miscellaneous, forints, paid now.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// A free-text description of the transaction.
    #[arg(long)]
    summary: String,

    /// The transaction category.
    #[arg(long, value_enum, default_value_t = Category::Miscellaneous)]
    category: Category,

    /// The amount as a decimal string, e.g. 2.50.
    #[arg(long)]
    amount: String,

    /// The currency of the amount.
    #[arg(long, value_enum, default_value_t = Currency::Huf)]
    currency: Currency,

    /// The paid date, e.g. 2021-02-03T09:31:10+0100. Defaults to now.
    #[arg(long)]
    paid: Option<String>,
}

impl AddArgs {
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn paid(&self) -> Option<&str> {
        self.paid.as_deref()
    }
}

/// Args for the `spendsync delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the transaction to delete.
    #[arg(long)]
    id: i64,
}

impl DeleteArgs {
    pub fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_with_filter() {
        let args = Args::parse_from(["spendsync", "list", "--filter", "coffee"]);
        match args.command() {
            Command::List(list) => assert_eq!(list.filter(), "coffee"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_add_defaults() {
        let args = Args::parse_from([
            "spendsync", "add", "--summary", "coffee", "--amount", "2.50",
        ]);
        match args.command() {
            Command::Add(add) => {
                assert_eq!(add.summary(), "coffee");
                assert_eq!(add.category(), Category::Miscellaneous);
                assert_eq!(add.currency(), Currency::Huf);
                assert_eq!(add.amount(), "2.50");
                assert!(add.paid().is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_delete() {
        let args = Args::parse_from(["spendsync", "delete", "--id", "7"]);
        match args.command() {
            Command::Delete(delete) => assert_eq!(delete.id(), 7),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
