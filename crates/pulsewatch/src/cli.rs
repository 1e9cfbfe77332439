//! Clap derive structures for the `pulsewatch` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pulsewatch_core::Priority;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pulsewatch -- rule-driven alerts for live device telemetry
#[derive(Debug, Parser)]
#[command(
    name = "pulsewatch",
    version,
    about = "Turn live device telemetry into prioritized notifications",
    long_about = "Evaluates a configurable rule set against every event on a telemetry\n\
        feed and raises deduplicated, auto-expiring notifications.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to use instead of the platform default
    #[arg(long, env = "PULSEWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format [default: defaults.output from the config, else table]
    #[arg(long, short = 'o', env = "PULSEWATCH_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: defaults.color from the config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate rules against a live feed or a recorded capture
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Evaluate a single event and print the notifications it raises
    Eval(EvalArgs),

    /// Inspect and validate the configured rule set
    #[command(alias = "r")]
    Rules(RulesArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Feed URL (overrides feed.url from the config)
    #[arg(long, short = 'u', env = "PULSEWATCH_FEED_URL", conflicts_with = "replay")]
    pub url: Option<String>,

    /// Replay a JSON-lines capture instead of connecting ("-" for stdin)
    #[arg(long, short = 'r')]
    pub replay: Option<PathBuf>,

    /// Only print notifications at or above this priority
    #[arg(long)]
    pub min_priority: Option<Priority>,

    /// Only print notifications in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Print a count summary when the watch ends
    #[arg(long)]
    pub summary: bool,
}

// ── Eval ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EvalArgs {
    /// Channel the event arrived on, e.g. sensors/greenhouse
    pub channel: String,

    /// Raw payload text (JSON or a bare value)
    pub payload: String,

    /// Connection id to attach to the event
    #[arg(long)]
    pub connection_id: Option<String>,
}

// ── Rules ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RulesCommand {
    /// List rules in evaluation order
    #[command(alias = "ls")]
    List,

    /// Show one rule in detail
    Get {
        /// Rule id
        id: String,
    },

    /// Check a config file's rules without running anything
    Validate {
        /// File to check (defaults to the active config)
        path: Option<PathBuf>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a starter config containing the built-in rules
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
