use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "er",
    about = "Element registry: 4096-bit flag sets with set-algebra queries",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file; ER_* environment variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub host: Option<String>,

    #[arg(long, global = true)]
    pub port: Option<u16>,

    #[arg(long, global = true)]
    pub prefix: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check that the store is reachable
    Ping,
    /// Create or replace an element's flags
    Put(PutArgs),
    /// Show an element's set bits
    Get(GetArgs),
    /// Delete an element and its index entries
    Delete(DeleteArgs),
    /// Elements having one bit
    Find(FindArgs),
    /// Elements having every listed bit
    FindAll(BitsArgs),
    /// Elements having any listed bit
    FindAny(BitsArgs),
    /// Elements having INCLUDE but none of the excluded bits
    FindNot(IncludeExcludeArgs),
    /// Known elements having none of the listed bits
    UniverseNot(BitsArgs),
    /// Like find-not, restricted to known elements
    AllNot(IncludeExcludeArgs),
    /// Store the find-all result under a temporary key
    StoreAll(StoreBitsArgs),
    /// Store the find-any result under a temporary key
    StoreAny(StoreBitsArgs),
    /// Store the universe-not result under a temporary key
    StoreNot(StoreBitsArgs),
    /// Store the all-not result under a temporary key
    StoreAllNot(StoreIncludeExcludeArgs),
    /// Show a stored result
    Inspect(InspectArgs),
    /// Delete a stored result before it expires
    Drop(DropArgs),
}

#[derive(Args)]
pub struct PutArgs {
    pub name: String,
    /// Bits to set; all others are cleared
    pub bits: Vec<usize>,
}

#[derive(Args)]
pub struct GetArgs {
    pub name: String,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub name: String,
    /// Scrub every bit index when the record's flags are unreadable
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct FindArgs {
    pub bit: usize,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct BitsArgs {
    #[arg(required = true, num_args = 1..)]
    pub bits: Vec<usize>,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct IncludeExcludeArgs {
    pub include: usize,
    #[arg(required = true, num_args = 1..)]
    pub exclude: Vec<usize>,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct StoreBitsArgs {
    /// Lifetime of the stored result in seconds
    #[arg(long)]
    pub ttl: i64,
    #[arg(required = true, num_args = 1..)]
    pub bits: Vec<usize>,
}

#[derive(Args)]
pub struct StoreIncludeExcludeArgs {
    #[arg(long)]
    pub ttl: i64,
    pub include: usize,
    #[arg(required = true, num_args = 1..)]
    pub exclude: Vec<usize>,
}

#[derive(Args)]
pub struct InspectArgs {
    pub key: String,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct DropArgs {
    pub key: String,
}
