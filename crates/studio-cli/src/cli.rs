use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "studio",
    about = "Studio: owners, materials, and wand crafting on a local ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Ledger log file (overrides the config file)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register a new owner
    RegisterOwner(RegisterOwnerArgs),
    /// Add a material entry to an owner
    RegisterMaterial(RegisterMaterialArgs),
    /// Move a quantity of material between owners
    Transfer(TransferArgs),
    /// Craft a wand from an owner's first two material entries
    CraftWand(CraftWandArgs),
    /// List every material entry
    Materials(MaterialsArgs),
    /// List every wand
    Wands(WandsArgs),
    /// Show one owner
    Owner(OwnerArgs),
    /// Call a ledger function by name with positional arguments
    Invoke(InvokeArgs),
    /// Rewrite the ledger log as a single snapshot
    Compact(CompactArgs),
}

#[derive(Args)]
pub struct RegisterOwnerArgs {
    pub owner: String,
}

#[derive(Args)]
pub struct RegisterMaterialArgs {
    pub description: String,
    #[arg(allow_hyphen_values = true)]
    pub quantity: String,
    pub owner: String,
}

#[derive(Args)]
pub struct TransferArgs {
    pub sender: String,
    pub description: String,
    #[arg(allow_hyphen_values = true)]
    pub quantity: String,
    pub receiver: String,
}

#[derive(Args)]
pub struct CraftWandArgs {
    pub owner: String,
}

#[derive(Args)]
pub struct MaterialsArgs {}
#[derive(Args)]
pub struct WandsArgs {}
#[derive(Args)]
pub struct OwnerArgs {
    pub id: String,
}

#[derive(Args)]
pub struct InvokeArgs {
    /// Function name, e.g. `TransferMaterial`
    pub function: String,
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct CompactArgs {}
