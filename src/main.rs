//! Binary entrypoint for the dragonkeep CLI.
//!
//! Commands:
//! - `play` - run the console game server on stdin/stdout
//! - `init` - write a starter `config.toml` and seed the data directory
//! - `status` - print a JSON snapshot of the world
//! - `maintain` - run one accrual/starvation sweep and exit
//!
//! See the library crate docs for module-level details: `dragonkeep::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use dragonkeep::config::Config;
use dragonkeep::game::{DragonStoreBuilder, GameEngine};
use dragonkeep::server::GameServer;

#[derive(Parser)]
#[command(name = "dragonkeep")]
#[command(about = "A community dragon-raising chat game")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the game server on the console
    #[command(alias = "start")]
    Play,
    /// Create a default configuration and data directory
    Init,
    /// Print a JSON snapshot of the world
    Status,
    /// Run one maintenance sweep over every stored dragon
    Maintain,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        info!("Initializing new dragonkeep configuration");
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        let config = Config::default();
        DragonStoreBuilder::new(&config.storage.data_dir)
            .world_dragon_name(&config.game.dragon_name)
            .open()?;
        info!("Initialized game data at {}", config.storage.data_dir);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);

    match cli.command {
        Commands::Play => {
            info!("Starting dragonkeep v{}", env!("CARGO_PKG_VERSION"));
            let server = GameServer::new(config)?;
            server.run().await?;
        }
        Commands::Status => {
            let server = GameServer::new(config)?;
            let snapshot = server.status_snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Maintain => {
            let engine = GameEngine::from_config(&config)?;
            let report = engine.run_maintenance().await?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Commands::Init => {}
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match (verbosity, config) {
        (0, Some(cfg)) => cfg.logging.level_filter(),
        (0, None) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    // Game output goes to stdout; keep log lines off it.
    builder.target(env_logger::Target::Stderr);

    let file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    match file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Echo to the console only when someone is watching it
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
