//! BottleForge CLI

use anyhow::{Context, Result};
use bottleforge_lib::toggle::find_tip;
use bottleforge_lib::{
    BottleForgeError, Config, ConfigStore, EnvSession, SaveOutcome, ToggleEntry, TIPS,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "bottleforge")]
#[command(about = "Edit environment variables of CrossOver/CXPatcher bottles")]
#[command(version)]
#[command(long_about = r#"BottleForge - cxbottle.conf environment editor

Reads the [EnvironmentVariables] section of a bottle's cxbottle.conf, lets you
switch variables on or off, and writes the section back without touching the
rest of the file. The previous file is kept as cxbottle.conf.bak.

EXAMPLES:
    bottleforge bottles                              # List bottles
    bottleforge show Steam                           # Show variables of bottle 'Steam'
    bottleforge set Steam WINEMSYNC=on MTL_HUD_ENABLED=off
    bottleforge unset Steam ROSETTA_ADVERTISE_AVX    # Remove a variable
    bottleforge tips Steam --add D3DM_ENABLE_METALFX # Quick-add MetalFX
    bottleforge --dry-run set ~/CXPBottles/Games WINEESYNC=1"#)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Extra directory to search for bottles (repeatable)
    #[arg(long = "bottle-root", global = true, value_name = "DIR")]
    bottle_roots: Vec<PathBuf>,

    /// Print the merged cxbottle.conf instead of writing it
    #[arg(long, global = true)]
    dry_run: bool,

    /// Increase logging (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// List discovered bottles
    Bottles,

    /// Show toggles and raw values of a bottle
    Show {
        /// Bottle name or path to a bottle directory
        bottle: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Switch variables on or off (adds missing ones)
    Set {
        bottle: String,

        /// Assignments like WINEMSYNC=on or MTL_HUD_ENABLED=0
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },

    /// Remove variables; their lines are deleted from the file
    Unset {
        bottle: String,

        #[arg(required = true, value_name = "KEY")]
        keys: Vec<String>,
    },

    /// Rename a variable
    Rename {
        bottle: String,
        old: String,
        new: String,
    },

    /// List quick-add tips, or add one to a bottle
    Tips {
        bottle: Option<String>,

        /// Tip to add
        #[arg(long, value_name = "KEY", requires = "bottle")]
        add: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::new()?;
    config.verbosity = cli.verbose;
    config.dry_run = cli.dry_run;
    config.prepend_roots(cli.bottle_roots);

    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter())
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Command::Bottles => list_bottles(&config),
        Command::Show { bottle, json } => show(&config, &bottle, json).await,
        Command::Set {
            bottle,
            assignments,
        } => {
            let parsed = assignments
                .iter()
                .map(|a| parse_assignment(a))
                .collect::<bottleforge_lib::Result<Vec<_>>>()?;
            edit(&config, &bottle, |session| {
                for (key, enabled) in &parsed {
                    session.set(key, *enabled)?;
                }
                Ok(())
            })
            .await
        }
        Command::Unset { bottle, keys } => {
            edit(&config, &bottle, |session| {
                for key in &keys {
                    session.remove(key)?;
                }
                Ok(())
            })
            .await
        }
        Command::Rename { bottle, old, new } => {
            edit(&config, &bottle, |session| session.rename(&old, &new)).await
        }
        Command::Tips { bottle, add } => match (bottle, add) {
            (Some(bottle), Some(key)) => {
                let tip = find_tip(&key).ok_or(BottleForgeError::VariableNotFound(key))?;
                edit(&config, &bottle, |session| session.add_tip(tip)).await
            }
            (bottle, _) => list_tips(&config, bottle.as_deref()).await,
        },
    }
}

fn list_bottles(config: &Config) -> Result<()> {
    let bottles = config.bottles();
    if bottles.is_empty() {
        println!("No bottles found.");
        return Ok(());
    }
    for bottle in bottles {
        println!(
            "{:<24} {:<10} {}",
            bottle.name,
            bottle.runtime.as_str(),
            bottle.path.display()
        );
    }
    Ok(())
}

async fn show(config: &Config, name: &str, json: bool) -> Result<()> {
    let bottle = config.bottle(name)?;
    let store = ConfigStore::for_bottle(&bottle);
    let session = store
        .load_async()
        .await
        .with_context(|| format!("Failed to load {}", store.path().display()))?;

    if json {
        let out = serde_json::json!({
            "bottle": bottle,
            "toggles": session.toggles(),
            "values": session.values(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Selected bottle: {} ({})", bottle.name, store.path().display());
    print_toggles(session.toggles());

    let others: Vec<_> = session
        .values()
        .iter()
        .filter(|(key, _)| !session.toggles().iter().any(|t| &t.key == *key))
        .collect();
    if !others.is_empty() {
        println!();
        println!("Other variables (preserved as-is):");
        for (key, value) in others {
            println!("  {} = {}", key, value);
        }
    }
    Ok(())
}

async fn list_tips(config: &Config, bottle: Option<&str>) -> Result<()> {
    let session = match bottle {
        Some(name) => {
            let bottle = config.bottle(name)?;
            Some(ConfigStore::for_bottle(&bottle).load_async().await?)
        }
        None => None,
    };

    for tip in TIPS.iter() {
        let added = session
            .as_ref()
            .map(|s| s.has_existing(tip.key))
            .unwrap_or(false);
        println!(
            "{}{} (default {})",
            tip.key,
            if added { " [present]" } else { "" },
            if tip.default_on { "on" } else { "off" }
        );
        println!("    {}", tip.description);
    }
    Ok(())
}

/// Load, apply `change`, then save or print the merged text
async fn edit<F>(config: &Config, name: &str, change: F) -> Result<()>
where
    F: FnOnce(&mut EnvSession) -> bottleforge_lib::Result<()>,
{
    let bottle = config.bottle(name)?;
    let store = ConfigStore::for_bottle(&bottle);
    let mut session = store
        .load_async()
        .await
        .with_context(|| format!("Failed to load {}", store.path().display()))?;

    change(&mut session)?;
    debug!("Session dirty: {}", session.is_dirty());

    if config.dry_run {
        print!("{}", store.preview(&session)?);
        return Ok(());
    }

    let (session, outcome) = store
        .save_async(session)
        .await
        .with_context(|| format!("Failed to save {}", store.path().display()))?;

    match outcome {
        SaveOutcome::Unchanged => println!("No changes to write (content identical)."),
        SaveOutcome::Written { path, backup } => {
            println!("Saved: {}", path.display());
            if let Some(backup) = backup {
                info!("Backup: {}", backup.display());
            }
        }
    }
    print_toggles(session.toggles());
    Ok(())
}

fn print_toggles(toggles: &[ToggleEntry]) {
    for toggle in toggles {
        println!(
            "  [{}] {}",
            if toggle.enabled { "x" } else { " " },
            toggle.key
        );
    }
}

/// Parse `KEY=VALUE` where VALUE is any boolean-like token
fn parse_assignment(input: &str) -> bottleforge_lib::Result<(String, bool)> {
    let invalid = || BottleForgeError::InvalidAssignment(input.to_string());

    let (key, value) = input.split_once('=').ok_or_else(invalid)?;
    let key = key.trim();
    if !bottleforge_lib::is_valid_key(key) || !bottleforge_lib::is_boolean_like(value) {
        return Err(invalid());
    }
    Ok((key.to_string(), bottleforge_lib::normalize_bool(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boolean_assignments() {
        assert_eq!(
            parse_assignment("WINEMSYNC=on").unwrap(),
            (String::from("WINEMSYNC"), true)
        );
        assert_eq!(
            parse_assignment(" MTL_HUD_ENABLED = 0").unwrap(),
            (String::from("MTL_HUD_ENABLED"), false)
        );
        assert!(parse_assignment("WINEMSYNC").is_err());
        assert!(parse_assignment("=1").is_err());
        assert!(parse_assignment("DXVK_HUD=fps").is_err());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
