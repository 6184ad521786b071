//! ram-policy - preview AliCloud RAM combined policies
//!
//! Packs local RAM policy documents into the combined policies the `ram_policy` resource would
//! create for a user, without calling the RAM API.

use std::fs;
use std::path::{Path, PathBuf};

use alicloud_ram_policy::{build_combined_policies, PolicyDetail, SourcePolicy, MAX_LENGTH};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::{debug, LevelFilter};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "ram-policy")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack policy documents into combined policies for a user
    Pack {
        /// RAM user the combined policies are named after
        #[arg(short, long, env = "ALICLOUD_RAM_USER_NAME")]
        user_name: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Policy documents, packed in the given order; the file stem is the policy name
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Serialize)]
struct PackOutput {
    user_name: String,
    policies: Vec<PolicyDetail>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Pack {
            user_name,
            format,
            files,
        } => run_pack(&user_name, format, &files),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn read_source(path: &Path) -> Result<SourcePolicy> {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("Cannot derive a policy name from {}", path.display()))?;
    let document = fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy document {}", path.display()))?;
    debug!("Read policy '{}' from {}", name, path.display());

    SourcePolicy::from_document(name, &document)
        .with_context(|| format!("Invalid policy document {}", path.display()))
}

fn run_pack(user_name: &str, format: OutputFormat, files: &[PathBuf]) -> Result<()> {
    let sources = files
        .iter()
        .map(|path| read_source(path.as_path()))
        .collect::<Result<Vec<_>>>()?;

    let combined = build_combined_policies(user_name, &sources)
        .with_context(|| format!("Failed to pack policies for user '{user_name}'"))?;

    match format {
        OutputFormat::Json => {
            let output = PackOutput {
                user_name: user_name.to_string(),
                policies: combined.iter().map(PolicyDetail::from).collect(),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize output")?
            );
        }
        OutputFormat::Text => {
            for policy in &combined {
                println!(
                    "{}\t{} statements\t{}/{} bytes",
                    policy.name,
                    policy.statements.len(),
                    policy.serialized_size(),
                    MAX_LENGTH
                );
            }
        }
    }
    Ok(())
}
