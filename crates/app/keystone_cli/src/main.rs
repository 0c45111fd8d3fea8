// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use keystone_core::config::SessionConfig;

mod cli;
mod commands;
mod logging;

/// Exit code for a denied access check.
const EXIT_DENIED: i32 = 3;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    let mut config = SessionConfig::from_env();
    if let Some(store) = &args.store {
        config.token_file = store.clone();
    }

    match &args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::Decode { token } => commands::decode(token)?,
        Commands::Check(check) => {
            if !commands::check(&config, check)? {
                std::process::exit(EXIT_DENIED);
            }
        }
        Commands::Login {
            access_token,
            refresh_token,
        } => commands::login(&config, access_token, refresh_token.as_deref())?,
        Commands::Logout => commands::logout(&config)?,
        Commands::Refresh => commands::refresh(&config)?,
    }

    Ok(())
}
