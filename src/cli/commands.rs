//! CLI commands for the ledger host
//!
//! Implements all command handlers for the CLI interface.

use crate::host::{HostConfig, LedgerHost, WorldState};
use crate::state::Response;
use crate::storage::{load_from_file, save_to_file, Storage, StorageConfig};
use crate::token::FUNCTIONS;
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub host: LedgerHost,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the persisted world state, or start from an empty one
    pub fn new(data_dir: PathBuf, host_config: HostConfig) -> CliResult<Self> {
        let storage_config = StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        };
        let storage = Storage::new(storage_config)?;

        let world = if storage.exists() {
            log::debug!("Loading world state from {:?}", data_dir);
            storage.load()?
        } else {
            WorldState::default()
        };

        Ok(Self {
            host: LedgerHost::from_world(host_config, world),
            storage,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.host.to_world())?;
        Ok(())
    }
}

/// Deploy a new token ledger
pub fn cmd_deploy(state: &mut AppState, name: &str) -> CliResult<()> {
    state.host.deploy(name)?;
    state.save()?;

    println!("✅ Ledger deployed: {}", name);
    println!("   Initialize it with: ledger invoke {} init <name> <symbol> <owner> <amount>", name);
    Ok(())
}

/// List deployed ledgers
pub fn cmd_list(state: &AppState) -> CliResult<()> {
    let ledgers = state.host.ledgers();

    if ledgers.is_empty() {
        println!("📭 No ledgers deployed. Create one with: ledger deploy <name>");
    } else {
        println!("📋 Ledgers:");
        for name in ledgers {
            let events = state.host.events(name)?.len();
            println!("   {} ({} events)", name, events);
        }
    }

    println!("\n   Functions: {}", FUNCTIONS.join(", "));
    Ok(())
}

/// Invoke a function and persist its effects
pub fn cmd_invoke(
    state: &mut AppState,
    ledger: &str,
    function: &str,
    params: &[String],
) -> CliResult<()> {
    let response = state.host.invoke(ledger, function, params);
    report(&response)?;
    state.save()?;
    Ok(())
}

/// Evaluate a function without persisting anything
pub fn cmd_query(state: &AppState, ledger: &str, function: &str, params: &[String]) -> CliResult<()> {
    let response = state.host.query(ledger, function, params);
    report(&response)
}

/// Show the most recent events of a ledger
pub fn cmd_events(state: &AppState, ledger: &str, count: usize) -> CliResult<()> {
    let events = state.host.events(ledger)?;

    if events.is_empty() {
        println!("📭 No events on {}", ledger);
        return Ok(());
    }

    println!("📜 Events on {} (latest {} of {}):", ledger, count.min(events.len()), events.len());
    let skip = events.len().saturating_sub(count);
    for event in events.iter().skip(skip) {
        println!(
            "   {} {} [{}] {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.name,
            &event.tx_id[..event.tx_id.len().min(8)],
            event.payload
        );
    }
    Ok(())
}

/// Export the world state to a file
pub fn cmd_export(state: &AppState, output: &Path) -> CliResult<()> {
    save_to_file(&state.host.to_world(), output)?;
    println!("✅ World state exported to {:?}", output);
    Ok(())
}

/// Replace the world state with the contents of a file
pub fn cmd_import(state: &mut AppState, input: &Path) -> CliResult<()> {
    let world = load_from_file(input)?;
    let ledgers = world.ledgers.len();

    state.host = LedgerHost::from_world(state.host.config().clone(), world);
    state.save()?;

    println!("✅ Imported {} ledger(s) from {:?}", ledgers, input);
    Ok(())
}

/// List the saved backups, most recent first
pub fn cmd_backups(state: &AppState) -> CliResult<()> {
    let backups = state.storage.list_backups();
    if backups.is_empty() {
        println!("📭 No backups in {:?}", state.data_dir);
        return Ok(());
    }

    println!("💾 Backups:");
    for index in backups {
        let world = state.storage.restore_backup(index)?;
        println!("   #{} ({} ledgers, nonce {})", index, world.ledgers.len(), world.nonce);
    }
    Ok(())
}

/// Roll the world state back to a saved backup
pub fn cmd_restore(state: &mut AppState, index: usize) -> CliResult<()> {
    let world = state.storage.restore_backup(index)?;
    state.host = LedgerHost::from_world(state.host.config().clone(), world);
    state.save()?;

    log::info!("World state restored from backup #{}", index);
    println!("✅ Restored backup #{}", index);
    Ok(())
}

fn report(response: &Response) -> CliResult<()> {
    if !response.is_success() {
        println!("❌ [{}] {}", response.status, response.message);
        return Err(response.message.clone().into());
    }

    if response.payload.is_empty() {
        println!("✅ OK");
    } else {
        println!("{}", response.payload_str());
    }
    Ok(())
}
