// orgdb - participant register and competition entry tool
//
//   orgdb import members.xlsx [--no-insert]
//   orgdb export members.xlsx
//   orgdb create_competition race.xlsx [--ssf | --json | --excel]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use orgdb::{Commands, FormatOptions, OutputKind, Registries, Settings};

#[derive(Parser)]
#[command(name = "orgdb")]
#[command(about = "Import, export and enter participants for club competitions")]
#[command(version)]
struct Cli {
    /// Settings file (default: ./orgdb.toml when present)
    #[arg(long, global = true, value_name = "TOML")]
    config: Option<PathBuf>,

    /// SQLite store, overrides the settings file
    #[arg(long, global = true, value_name = "SQLITE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge a person file into the store
    Import {
        path: PathBuf,

        /// Only update persons already in the store
        #[arg(long)]
        no_insert: bool,
    },

    /// Write all stored persons to a file, with class labels
    Export { path: PathBuf },

    /// Build a competition from a person file
    #[command(name = "create_competition")]
    CreateCompetition {
        path: PathBuf,

        /// Write SSFEntry_<name>.xml next to the input
        #[arg(long, conflicts_with_all = ["json", "excel"])]
        ssf: bool,

        /// Write <name>.json next to the input
        #[arg(long, conflicts_with = "excel")]
        json: bool,

        /// Write <name>.xlsx next to the input
        #[arg(long)]
        excel: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref()).context("cannot load settings")?;
    if let Some(store) = cli.store {
        settings.store = store;
    }

    let no_insert = matches!(cli.command, Command::Import { no_insert: true, .. });
    let registries = Registries::new(FormatOptions::from_settings(&settings).with_no_insert(no_insert));
    let commands = Commands::new(&settings, registries);

    match cli.command {
        Command::Import { path, .. } => {
            commands.import(&path)?;
        }
        Command::Export { path } => {
            commands.export(&path)?;
        }
        Command::CreateCompetition {
            path,
            ssf,
            json,
            excel,
        } => {
            let output = if ssf {
                Some(OutputKind::Ssf)
            } else if json {
                Some(OutputKind::Json)
            } else if excel {
                Some(OutputKind::Excel)
            } else {
                None
            };
            commands.create_competition(&path, output)?;
        }
    }

    Ok(())
}
