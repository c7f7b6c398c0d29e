//! calgroups - manage named calendar groups from the terminal.
//!
//! Operates on the groups file resolved from `--file`, `CALGROUPS_FILE`, or
//! the application config, in that order.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use calgroups_core::{CalendarGroup, Config, GroupManager, GroupStorage, GroupUpdate};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "calgroups")]
#[command(about = "Organize calendars into named groups")]
struct Cli {
    /// Groups file to operate on (overrides config and CALGROUPS_FILE)
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Groups(GroupCommand),
    /// Show or change the saved configuration
    Config {
        /// Groups file to use by default
        #[arg(long)]
        groups_file: Option<PathBuf>,

        /// Number of backups to keep
        #[arg(long)]
        max_backups: Option<usize>,
    },
}

/// Commands that operate on the groups file.
#[derive(Subcommand)]
enum GroupCommand {
    /// List all groups
    List,
    /// Show one group in detail
    Show { name: String },
    Create {
        name: String,

        /// Calendar id to include (repeatable)
        #[arg(short, long = "calendar")]
        calendars: Vec<String>,

        #[arg(short, long, default_value = "")]
        description: String,
    },
    Delete { name: String },
    /// Add a calendar id to a group
    Add { group: String, calendar: String },
    /// Remove a calendar id from a group
    Remove { group: String, calendar: String },
    Rename { old: String, new: String },
    /// Replace a group's description
    Describe { group: String, text: String },
    /// List groups containing a calendar id
    Containing { calendar: String },
    /// Print group statistics as JSON
    Stats,
    /// Copy the groups file into the backup directory
    Backup,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level (e.g., RUST_LOG=calgroups_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    let config = Config::load().context("Failed to load config")?;
    match cli.command {
        Commands::Config {
            groups_file,
            max_backups,
        } => configure(config, groups_file, max_backups),
        Commands::Groups(command) => {
            let storage = open_storage(&config, cli.file)?;
            debug!(path = %storage.path().display(), "Using groups file");
            run(GroupManager::new(storage), command)
        }
    }
}

fn run(mut manager: GroupManager, command: GroupCommand) -> Result<()> {
    match command {
        GroupCommand::List => {
            let groups = manager.list_groups()?;
            if groups.is_empty() {
                println!("No groups.");
            }
            for group in &groups {
                println!("{} ({} calendars)", group.name(), group.calendar_count());
            }
        }
        GroupCommand::Show { name } => {
            let group = manager
                .get_group(&name)?
                .with_context(|| format!("Group '{}' not found", name))?;
            print_group(&group);
        }
        GroupCommand::Create {
            name,
            calendars,
            description,
        } => {
            let group = manager.create_group(&name, calendars, &description)?;
            println!("Created group '{}'", group.name());
        }
        GroupCommand::Delete { name } => {
            if !manager.delete_group(&name)? {
                anyhow::bail!("Group '{}' not found", name);
            }
            println!("Deleted group '{}'", name);
        }
        GroupCommand::Add { group, calendar } => {
            if manager.add_calendar_to_group(&group, &calendar)? {
                println!("Added {} to '{}'", calendar, group);
            } else {
                println!("'{}' already contains {}", group, calendar);
            }
        }
        GroupCommand::Remove { group, calendar } => {
            if manager.remove_calendar_from_group(&group, &calendar)? {
                println!("Removed {} from '{}'", calendar, group);
            } else {
                println!("'{}' does not contain {}", group, calendar);
            }
        }
        GroupCommand::Rename { old, new } => {
            let group = manager.rename_group(&old, &new)?;
            println!("Renamed '{}' to '{}'", old, group.name());
        }
        GroupCommand::Describe { group, text } => {
            manager.update_group(&group, &GroupUpdate::new().with_description(text))?;
            println!("Updated description of '{}'", group);
        }
        GroupCommand::Containing { calendar } => {
            for group in manager.get_groups_containing_calendar(&calendar)? {
                println!("{}", group.name());
            }
        }
        GroupCommand::Stats => {
            let stats = manager.group_stats()?;
            let json =
                serde_json::to_string_pretty(&stats).context("Failed to encode statistics")?;
            println!("{}", json);
        }
        GroupCommand::Backup => {
            let path = manager.backup()?;
            println!("Backup written to {}", path.display());
        }
    }

    Ok(())
}

fn open_storage(config: &Config, file: Option<PathBuf>) -> Result<GroupStorage> {
    let path = match file {
        Some(path) => path,
        None => config.groups_path()?,
    };
    let storage = GroupStorage::new(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(storage.with_max_backups(config.backup_limit()))
}

/// Print the effective settings, or save the given ones.
fn configure(
    mut config: Config,
    groups_file: Option<PathBuf>,
    max_backups: Option<usize>,
) -> Result<()> {
    let path = Config::config_path()?;
    if groups_file.is_none() && max_backups.is_none() {
        println!("Config file: {}", path.display());
        println!("Groups file: {}", config.groups_path()?.display());
        println!("Backups:     {}", config.backup_limit());
        return Ok(());
    }

    if groups_file.is_some() {
        config.groups_file = groups_file;
    }
    if max_backups.is_some() {
        config.max_backups = max_backups;
    }
    config.save().context("Failed to save config")?;
    println!("Saved {}", path.display());
    Ok(())
}

fn print_group(group: &CalendarGroup) {
    println!("Name:        {}", group.name());
    if !group.description().is_empty() {
        println!("Description: {}", group.description());
    }
    println!("Created:     {}", group.created().to_rfc3339());
    println!("Modified:    {}", group.modified().to_rfc3339());
    println!("Calendars:   {}", group.calendar_count());
    for id in group.calendar_ids() {
        println!("  - {}", id);
    }
}
