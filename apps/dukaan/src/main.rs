//! # Dukaan Operator CLI
//!
//! Maintenance commands against the database the app would use.
//!
//! ## Usage
//! ```bash
//! dukaan path                    # which file is in use, and why
//! dukaan migrate                 # copy the legacy file to app data
//! dukaan export backup.json      # full dump to a JSON file
//! dukaan import backup.json      # replace all data from a JSON file
//! dukaan stats                   # dashboard figures as JSON
//!
//! dukaan --config ./dukaan.toml stats
//! DUKAAN_DB_PATH=/mnt/usb/dukaan.db dukaan stats
//! ```

use dukaan_app::commands::{backup, database, report};
use dukaan_app::{init_tracing, AppConfig, AppContext};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "\
Dukaan POS operator tool

Usage: dukaan [--config <PATH>] <COMMAND>

Commands:
  path            Show the database file in use and both candidate locations
  migrate         Copy the legacy database into the application-data directory
  export <FILE>   Write a full JSON backup
  import <FILE>   Replace all products, sales and items from a JSON backup
  stats           Print dashboard figures

Options:
  -c, --config <PATH>  Config file (default: the OS config directory)
  -h, --help           Show this help message";

enum Command {
    Path,
    Migrate,
    Export(PathBuf),
    Import(PathBuf),
    Stats,
}

struct Cli {
    config: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Option<Cli>, String> {
    let mut config = None;
    let mut words = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let path = args.get(i + 1).ok_or("--config needs a path")?;
                config = Some(PathBuf::from(path));
                i += 1;
            }
            "--help" | "-h" => return Ok(None),
            other => words.push(other),
        }
        i += 1;
    }

    let command = match words.as_slice() {
        ["path"] => Command::Path,
        ["migrate"] => Command::Migrate,
        ["export", file] => Command::Export(PathBuf::from(file)),
        ["import", file] => Command::Import(PathBuf::from(file)),
        ["stats"] => Command::Stats,
        [] => return Ok(None),
        other => return Err(format!("unknown command: {}", other.join(" "))),
    };

    Ok(Some(Cli { config, command }))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let cli = match parse_args(&args) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {e}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = AppConfig::load(cli.config)?;
    init_tracing(config.log_filter());

    // Migration runs before anything opens a database
    if let Command::Migrate = cli.command {
        let resolver = config.path_resolver();
        if database::migrate_legacy_database(&resolver).await {
            println!("✓ Database available at {}", resolver.new_path().display());
            return Ok(ExitCode::SUCCESS);
        }
        println!("✗ Nothing migrated from {}", resolver.legacy_path().display());
        return Ok(ExitCode::FAILURE);
    }

    let ctx = AppContext::start(config).await?;

    let result = match &cli.command {
        Command::Path => {
            let info = database::database_info(&ctx, &ctx.resolver()).await;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        Command::Export(path) => backup::export_backup_file(&ctx, path).await.map(|bytes| {
            println!("✓ Wrote {} bytes to {}", bytes, path.display());
        }),
        Command::Import(path) => backup::import_backup_file(&ctx, path).await.map(|counts| {
            println!(
                "✓ Restored {} products, {} sales, {} sale items",
                counts.products, counts.sales, counts.sale_items
            );
        }),
        Command::Stats => {
            let stats = report::dashboard_stats(&ctx).await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::Migrate => Ok(()),
    };

    ctx.close().await;
    result?;
    Ok(ExitCode::SUCCESS)
}
