use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use pdg::emit::JsonFormatter;
use pdg::{
    parse_command, Address, Command, ConfigStore, ConsoleSink, ListingProgram, MemoryConfig,
    Plugin, CONFIG_VARS,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdg")]
#[command(about = "Render decompiled listings the way the pdg command family does")]
#[command(version = "0.1.0")]
#[command(author = "Gianluca Brigandi <gbrigand@gmail.com>")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pdg commands against a function of a listing
    Run {
        listing: PathBuf,

        /// Address inside the function; defaults to the first function's entry
        #[arg(long)]
        at: Option<Address>,

        /// Command line to dispatch, e.g. `pdg`, `pdgo`, `pdg*`
        #[arg(short = 'c', long = "cmd", default_value = "pdg")]
        commands: Vec<String>,

        /// Configuration override applied after plugin init
        #[arg(short = 'e', long = "eval", value_name = "KEY=VALUE")]
        evals: Vec<String>,

        /// Print the structured payload as JSON instead of console text
        #[arg(long)]
        json: bool,
    },

    /// Parse and validate a listing
    Check { listing: PathBuf },

    /// Show every plugin variable with its value and description
    Config {
        #[arg(short = 'e', long = "eval", value_name = "KEY=VALUE")]
        evals: Vec<String>,

        #[arg(long)]
        json: bool,
    },
}

/// Console writing payloads to stdout and diagnostics to stderr.
#[derive(Default)]
struct TerminalConsole {
    diagnostics: usize,
}

impl ConsoleSink for TerminalConsole {
    fn print(&mut self, text: &str) {
        if text.ends_with('\n') {
            print!("{}", text);
        } else {
            println!("{}", text);
        }
    }

    fn diagnostic(&mut self, text: &str) {
        self.diagnostics += 1;
        eprintln!("{} {}", "error:".bright_red().bold(), text);
    }
}

#[derive(Serialize)]
struct ConfigEntry {
    key: String,
    value: String,
    default: String,
    desc: String,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            listing,
            at,
            commands,
            evals,
            json,
        } => cmd_run(listing, at, commands, evals, json),
        Commands::Check { listing } => cmd_check(listing),
        Commands::Config { evals, json } => cmd_config(evals, json),
    }
}

fn apply_evals(config: &mut dyn ConfigStore, evals: &[String]) -> Result<()> {
    for eval in evals {
        let (key, value) = eval
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got {:?}", eval))?;
        config
            .set(key.trim(), value.trim())
            .with_context(|| format!("cannot set {}", key.trim()))?;
        debug!(key = key.trim(), value = value.trim(), "config override");
    }
    Ok(())
}

fn cmd_run(
    listing: PathBuf,
    at: Option<Address>,
    commands: Vec<String>,
    evals: Vec<String>,
    json: bool,
) -> Result<()> {
    let program = ListingProgram::from_file(&listing)
        .with_context(|| format!("cannot load {}", listing.display()))?;
    let at = at
        .or_else(|| program.listing().functions.first().map(|f| f.range.start))
        .unwrap_or(Address(0));
    info!(listing = %listing.display(), at = %at, "loaded listing");

    let plugin = Plugin::new(&program, &program);
    let mut config = MemoryConfig::new();
    plugin.init(&mut config)?;
    apply_evals(&mut config, &evals)?;

    let mut console = TerminalConsole::default();
    for command in &commands {
        match (json, parse_command(command)) {
            (_, None) => {
                console.diagnostic(&format!("Unknown command {:?}", command));
            }
            (true, Some(Command::Decompile(mode))) => {
                let options = pdg::style_options(&config);
                match plugin.decompiler().decompile(at, mode, &options) {
                    Ok(payload) => println!("{}", JsonFormatter::to_string(&payload)?),
                    Err(err) => console.diagnostic(&err.to_string()),
                }
            }
            (_, Some(_)) => {
                plugin.call(command, at, &config, &mut console);
            }
        }
    }
    plugin.fini();

    if console.diagnostics > 0 {
        bail!("{} command(s) failed", console.diagnostics);
    }
    Ok(())
}

fn cmd_check(listing: PathBuf) -> Result<()> {
    match pdg_listing::parse_file(&listing) {
        Ok(parsed) => {
            println!("{}", "VALID".bright_green().bold());
            for func in &parsed.functions {
                println!(
                    "  {} {}..{} {} statement(s)",
                    func.symbol,
                    func.range.start,
                    func.range.end,
                    func.decompiled.addresses().len()
                );
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", "INVALID".bright_red().bold());
            println!("\n{}", "Listing Error:".bright_red());
            println!("{}", e);
            Err(anyhow!("Validation failed"))
        }
    }
}

fn cmd_config(evals: Vec<String>, json: bool) -> Result<()> {
    let program = ListingProgram::default();
    let plugin = Plugin::new(&program, &program);
    let mut config = MemoryConfig::new();
    plugin.init(&mut config)?;
    apply_evals(&mut config, &evals)?;

    let entries: Vec<ConfigEntry> = CONFIG_VARS
        .iter()
        .filter_map(|var| config.node(var.key))
        .map(|node| ConfigEntry {
            key: node.name.clone(),
            value: node.value.clone(),
            default: node.default.clone(),
            desc: node.desc.clone(),
        })
        .collect();

    if json {
        println!("{}", JsonFormatter::to_string(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let value = if entry.value == entry.default {
            entry.value.normal()
        } else {
            entry.value.bright_yellow()
        };
        println!(
            "{} = {}  {}",
            entry.key.bright_cyan(),
            value,
            format!("# {}", entry.desc).dimmed()
        );
    }
    Ok(())
}
