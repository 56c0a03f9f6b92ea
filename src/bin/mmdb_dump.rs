//! mmdb-dump: inspect a MaxMindDB-format database from the command
//! line — print its metadata, look up an address, or walk the full
//! value tree for an address.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mmdb::mmdb::{PathStep, Reader};

#[derive(Parser, Debug)]
#[command(about = "Inspect a MaxMindDB-format database")]
struct Cli {
    /// Path to the .mmdb file
    database: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the database's metadata block
    Metadata,
    /// Look up an address and print its resolved scalar path
    Lookup {
        address: String,
        /// Dotted path into the record, e.g. "country.iso_code"
        #[arg(long)]
        path: Option<String>,
    },
    /// Look up an address and print every leaf value in its record
    Walk { address: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let reader = Reader::open(&cli.database)
        .with_context(|| format!("failed to open {}", cli.database.display()))?;

    match cli.command {
        Command::Metadata => {
            let meta = reader.metadata();
            println!("binary_format_major_version: {}", meta.binary_format_major_version);
            println!("binary_format_minor_version: {}", meta.binary_format_minor_version);
            println!("ip_version: {}", meta.ip_version);
            println!("record_size: {}", meta.record_size);
            println!("node_count: {}", meta.node_count);
            println!("database_type: {}", meta.database_type);
            println!("languages: {:?}", meta.languages);
            println!("build_epoch: {}", meta.build_epoch);
        }
        Command::Lookup { address, path } => {
            let steps = match &path {
                Some(p) => parse_path(p),
                None => Vec::new(),
            };
            match reader.lookup_path(&address, &steps)? {
                Some(value) => println!("{value:?}"),
                None => println!("no match for {address}"),
            }
        }
        Command::Walk { address } => match reader.lookup_all(&address)? {
            Some(entries) => {
                for entry in entries {
                    println!("{} = {:?}", format_path(&entry.path), entry.value);
                }
            }
            None => println!("no match for {address}"),
        },
    }

    Ok(())
}

fn parse_path(raw: &str) -> Vec<PathStep> {
    raw.split('.')
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<usize>() {
            Ok(idx) => PathStep::Index(idx),
            Err(_) => PathStep::key(s),
        })
        .collect()
}

fn format_path(path: &[PathStep]) -> String {
    path.iter()
        .map(|step| match step {
            PathStep::Key(k) => k.clone(),
            PathStep::Index(i) => i.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}
