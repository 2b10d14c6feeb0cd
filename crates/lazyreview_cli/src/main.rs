//! lazyreview - spaced-repetition review manager for a markdown knowledge base.

mod app;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lazyreview_core::Difficulty;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lazyreview")]
#[command(about = "Schedule, list and record note reviews", version)]
struct Cli {
    /// Knowledge-base root directory
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Config file (default: config/kb_config.yaml, then system/config/kb_config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log directory (default: <root>/.lazyreview/logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive the previous checklist and generate today's
    Today,

    /// Record one completed review of a note
    MarkDone {
        /// Note path, relative to the root
        path: String,
    },

    /// Record every checked item of the checklist
    Sync {
        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Leave checked boxes in the checklist
        #[arg(long)]
        keep_checks: bool,

        /// Replace checked boxes without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Change a note's difficulty
    SetDifficulty {
        /// Note path, relative to the root
        path: String,

        /// easy, medium or hard
        difficulty: Difficulty,
    },

    /// Check metadata consistency and repair flagged notes
    Fix {
        /// Repair every flagged note without asking
        #[arg(long)]
        auto: bool,

        /// Report what would be repaired without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show knowledge-base statistics
    Stats,

    /// Copy all markdown notes into the SQLite store
    Import,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = app::absolute_root(&cli.root)?;
    app::start_logging(&root, cli.log_dir.as_deref(), cli.log_level.as_deref());
    let app = app::App::load(root, cli.config.as_deref())?;

    match cli.command {
        Commands::Today => commands::today::run(&app),
        Commands::MarkDone { path } => commands::review::mark_done(&app, &path),
        Commands::Sync {
            dry_run,
            keep_checks,
            yes,
        } => commands::sync::run(&app, dry_run, keep_checks, yes),
        Commands::SetDifficulty { path, difficulty } => {
            commands::review::set_difficulty(&app, &path, difficulty)
        }
        Commands::Fix { auto, dry_run } => commands::fix::run(&app, auto, dry_run),
        Commands::Stats => commands::stats::run(&app),
        Commands::Import => commands::import::run(&app),
    }
}
