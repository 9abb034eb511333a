use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use collabnets::{logging, runner, Command, Settings, Stowage};

#[derive(Parser, Debug)]
#[command(version, about = "Co-authorship networks and centralization from OpenAlex data")]
struct Args {
    /// Data root; overrides `data_root` from the settings.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Settings file (TOML). Defaults to `collabnets.toml` if present.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    if let Some(root) = args.root {
        settings.data_root = root;
    }
    let root_str = settings.data_root.to_string_lossy().to_string();
    let stowage = Stowage::new(&root_str)
        .with_context(|| format!("preparing data root {}", root_str))?;
    logging::init(&stowage.logs).context("starting logging")?;

    runner(&args.command, &stowage, &settings)
        .with_context(|| format!("{:?} failed", args.command))
}
