use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use linkreach::commands::{
    extract_command, facts_info_command, infer_command, reach_command, ReachOptions,
};
use linkreach::init_logging;

/// Linker-map fact extraction and vulnerable-function reachability.
///
/// A thin wrapper around `reach-core` (`reach_core` in code); all substantive
/// logic lives in the library.
#[derive(Parser, Debug)]
#[command(
    name = "linkreach",
    version,
    about = "Linker-map fact graphs and reachability classification",
    long_about = None
)]
struct Cli {
    /// Log at debug level unless LINKREACH_LOG says otherwise.
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a linker map into fact files.
    ///
    /// Writes nodes/nodeprops/edges/edgeprops facts, `definitions.json` and
    /// `manifest.json` into the output directory.
    Extract {
        /// Linker map produced with `-Map`.
        #[arg(long)]
        map: PathBuf,

        /// Directory to write facts into (created if missing).
        #[arg(long)]
        out_dir: PathBuf,

        /// Id context prefix. Defaults to `$GlobalContext` + `linkmap`.
        #[arg(long)]
        context: Option<String>,
    },

    /// Derive inferred edges from a facts directory.
    Infer {
        /// Directory holding the base fact files.
        #[arg(long)]
        facts: PathBuf,

        /// Where to write the `inferred_*` files. Defaults to `--facts`.
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Also write the rules as a relational program (`rules.dl`).
        #[arg(long, default_value_t = false)]
        emit_rules: bool,
    },

    /// Summarize a facts directory: node and edge counts per kind.
    FactsInfo {
        #[arg(long)]
        facts: PathBuf,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Classify vulnerabilities by reachability from an entry point.
    Reach {
        /// Vulnerability descriptor JSON.
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Where to write the report JSON.
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Facts directory handed to the search tool.
        #[arg(short = 'f', long)]
        facts: PathBuf,

        /// Search tool binary. Defaults to `$REACH_BIN`, then `reach`.
        #[arg(short = 'r', long)]
        reach: Option<PathBuf>,

        /// Source tree holding package manifests, enables version filtering.
        #[arg(short = 's', long)]
        src: Option<PathBuf>,

        /// Also export reachable paths as facts into this directory.
        #[arg(short = 'g', long)]
        graph: Option<PathBuf>,

        /// Entry point function. Defaults to `main`.
        #[arg(short = 'e', long)]
        entry: Option<String>,

        /// YAML or JSON run configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip demangling node names.
        #[arg(long, default_value_t = false)]
        no_demangle: bool,

        /// Arguments passed verbatim to the search tool; consumes the rest.
        #[arg(short = 'a', long = "args", num_args = 1.., allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Extract { map, out_dir, context } => {
            extract_command(&map, &out_dir, context)?;
        }
        Command::Infer { facts, out_dir, emit_rules } => {
            infer_command(&facts, out_dir.as_deref(), emit_rules)?;
        }
        Command::FactsInfo { facts, json } => facts_info_command(&facts, json)?,
        Command::Reach {
            input,
            output,
            facts,
            reach,
            src,
            graph,
            entry,
            config,
            no_demangle,
            args,
        } => {
            let options = ReachOptions {
                input,
                output,
                facts,
                reach,
                src,
                graph,
                entry,
                config,
                no_demangle,
                args,
            };
            reach_command(&options)?;
        }
    }

    Ok(())
}
