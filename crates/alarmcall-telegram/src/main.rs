//! Alarm Call Telegram Bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx ZVONOK_API_TOKEN=yyy cargo run -p alarmcall-telegram -- --env production
//! ```

use std::path::PathBuf;

use alarmcall_core::{config, Environment, Settings};
use alarmcall_persistence::Database;
use alarmcall_telegram::AlarmCallBot;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Alarm Call Bot - phone calls for urgent channel posts
#[derive(Parser, Debug)]
#[command(name = "alarmcall-telegram")]
#[command(about = "Telegram bot that calls subscribers when an alert is posted")]
struct Args {
    /// Environment to run the bot in
    #[arg(long, value_enum, env = "ALARMCALL_ENV", default_value_t = Environment::Testing)]
    env: Environment,

    /// Database file (default: ~/.alarm-call/db/calls.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Verbose logging (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot in polling mode (default)
    Run,

    /// Create the database tables
    InitDb {
        /// Drop existing tables first. Deletes all phones and call windows.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Before parsing so `env = ...` arguments can come from .env files.
    let env_files = config::load_env_files();
    let args = Args::parse();

    let filter = match (args.verbose, args.env.is_debug()) {
        (0, false) => {
            "alarmcall_telegram=info,alarmcall_zvonok=info,alarmcall_persistence=info,\
             alarmcall_core=info,teloxide=warn"
        }
        (0, true) | (1, _) => {
            "alarmcall_telegram=debug,alarmcall_zvonok=debug,alarmcall_persistence=debug,\
             alarmcall_core=debug,teloxide=info"
        }
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    env_files.log();

    if let Err(e) = config::ensure_all_dirs() {
        tracing::warn!(error = %e, "Failed to create all directories");
    }

    let db_path = args.db.unwrap_or_else(config::database_file);
    let db = Database::open(&db_path)?;

    match args.command.unwrap_or(Commands::Run) {
        Commands::InitDb { force } => {
            db.init(force)?;
            println!("Database ready at {}", db_path.display());
            Ok(())
        }
        Commands::Run => {
            let settings = Settings::from_env(args.env)?;
            let bot = AlarmCallBot::new(&settings, db)?;

            match bot.get_me().await {
                Ok(username) => {
                    tracing::info!(username = %username, "Bot initialized successfully");
                    println!("\nAlarm Call Bot");
                    println!("   Bot: @{}", username);
                    println!("   Environment: {:?}", args.env);
                    println!("   Database: {}", db_path.display());
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to get bot info");
                    return Err(e.into());
                }
            }

            println!("   Press Ctrl+C to stop\n");
            bot.start_polling().await?;
            Ok(())
        }
    }
}
