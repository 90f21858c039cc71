use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use studio_ledger::{Dispatcher, ErrorKind, LedgerEngine, LedgerError, Material, Owner, Wand};
use studio_store::{FileKvStore, StoreError};
use tracing::debug;

use crate::cli::*;
use crate::config::StudioConfig;

type Engine = LedgerEngine<FileKvStore>;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    let result = open_engine(&cli).and_then(|engine| execute(cli.command, &engine, format));
    if let (Err(e), OutputFormat::Json) = (&result, format) {
        println!("{}", error_payload(e));
    }
    result
}

fn open_engine(cli: &Cli) -> anyhow::Result<Engine> {
    let config = StudioConfig::resolve(cli.config.as_deref(), cli.store.as_deref())?;
    debug!(path = %config.store.path.display(), "opening ledger store");
    let store = FileKvStore::open(&config.store.path, config.file_store_config())
        .with_context(|| format!("failed to open store {}", config.store.path.display()))?;
    Ok(LedgerEngine::with_config(store, config.engine))
}

fn execute(command: Command, engine: &Engine, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Command::RegisterOwner(args) => cmd_register_owner(engine, args, format),
        Command::RegisterMaterial(args) => cmd_register_material(engine, args, format),
        Command::Transfer(args) => cmd_transfer(engine, args, format),
        Command::CraftWand(args) => cmd_craft_wand(engine, args, format),
        Command::Materials(_) => cmd_materials(engine, format),
        Command::Wands(_) => cmd_wands(engine, format),
        Command::Owner(args) => cmd_owner(engine, args, format),
        Command::Invoke(args) => cmd_invoke(engine, args),
        Command::Compact(_) => cmd_compact(engine, format),
    }
}

fn cmd_register_owner(engine: &Engine, args: RegisterOwnerArgs, format: OutputFormat) -> anyhow::Result<()> {
    let owner = engine.register_owner(&args.owner)?;
    emit(format, &owner, || {
        println!("{} Registered owner {}", "✓".green().bold(), owner.id.bold());
    })
}

fn cmd_register_material(engine: &Engine, args: RegisterMaterialArgs, format: OutputFormat) -> anyhow::Result<()> {
    let material = engine.register_material(&args.description, &args.quantity, &args.owner)?;
    emit(format, &material, || {
        println!(
            "{} Registered {} × {} for {}",
            "✓".green().bold(),
            material.quantity.to_string().bold(),
            material.description.cyan(),
            material.owner.bold()
        );
    })
}

fn cmd_transfer(engine: &Engine, args: TransferArgs, format: OutputFormat) -> anyhow::Result<()> {
    let receipt = engine.transfer_material(&args.sender, &args.description, &args.quantity, &args.receiver)?;
    emit(format, &receipt, || {
        println!(
            "{} Transferred {} × {} from {} to {}",
            "✓".green().bold(),
            receipt.quantity.to_string().bold(),
            receipt.description.cyan(),
            receipt.sender.id.bold(),
            receipt.receiver.id.bold()
        );
        println!("  {} now holds {}", receipt.sender.id, receipt.sender.total_quantity(&receipt.description));
        println!("  {} now holds {}", receipt.receiver.id, receipt.receiver.total_quantity(&receipt.description));
    })
}

fn cmd_craft_wand(engine: &Engine, args: CraftWandArgs, format: OutputFormat) -> anyhow::Result<()> {
    let wand = engine.craft_wand(&args.owner)?;
    emit(format, &wand, || {
        println!("{} Crafted a wand for {}", "✓".green().bold(), wand.owner.bold());
        for material in &wand.materials {
            print_material(material);
        }
    })
}

fn cmd_materials(engine: &Engine, format: OutputFormat) -> anyhow::Result<()> {
    let materials = engine.list_materials()?;
    emit(format, &materials, || {
        if materials.is_empty() {
            println!("No materials.");
        }
        for material in &materials {
            print_material(material);
        }
    })
}

fn cmd_wands(engine: &Engine, format: OutputFormat) -> anyhow::Result<()> {
    let wands = engine.list_wands()?;
    emit(format, &wands, || {
        if wands.is_empty() {
            println!("No wands.");
        }
        for wand in &wands {
            print_wand(wand);
        }
    })
}

fn cmd_owner(engine: &Engine, args: OwnerArgs, format: OutputFormat) -> anyhow::Result<()> {
    let owner = engine.get_owner(&args.id)?;
    emit(format, &owner, || print_owner(&owner))
}

fn cmd_invoke(engine: &Engine, args: InvokeArgs) -> anyhow::Result<()> {
    let payload = Dispatcher::new(engine).call(&args.function, &args.args)?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn cmd_compact(engine: &Engine, format: OutputFormat) -> anyhow::Result<()> {
    let before = engine.store().log_len()?;
    engine.store().compact()?;
    let after = engine.store().log_len()?;
    emit(format, &json!({ "before": before, "after": after }), || {
        println!("{} Compacted {}: {} → {} bytes", "✓".green(), engine.store().path().display(), before, after);
    })
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn print_material(material: &Material) {
    println!(
        "  {} {} × {}",
        material.owner.dimmed(),
        material.quantity.to_string().bold(),
        material.description.cyan()
    );
}

fn print_wand(wand: &Wand) {
    let parts: Vec<&str> = wand.materials.iter().map(|m| m.description.as_str()).collect();
    println!("  {} wand ({})", wand.owner.dimmed(), parts.join(" + ").cyan());
}

fn print_owner(owner: &Owner) {
    println!("Owner {}", owner.id.bold());
    if owner.materials.is_empty() {
        println!("  Materials: none");
    } else {
        println!("  Materials:");
        for material in &owner.materials {
            print_material(material);
        }
    }
    println!("  Wands: {}", owner.wands.len().to_string().yellow());
    for wand in &owner.wands {
        print_wand(wand);
    }
}

/// Machine-readable form of a failure for `--format json`.
fn error_payload(err: &anyhow::Error) -> serde_json::Value {
    json!({
        "error": {
            "kind": error_kind(err),
            "message": format!("{err:#}"),
        }
    })
}

fn error_kind(err: &anyhow::Error) -> ErrorKind {
    for cause in err.chain() {
        if let Some(ledger) = cause.downcast_ref::<LedgerError>() {
            return ledger.kind();
        }
        if cause.downcast_ref::<StoreError>().is_some() {
            return ErrorKind::StoreUnavailable;
        }
    }
    ErrorKind::InvalidArgument
}
