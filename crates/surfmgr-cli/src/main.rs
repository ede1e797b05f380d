//! CLI entry point - the composition root.
//!
//! Parses arguments, initialises logging, bootstraps a `CliContext` and
//! routes to the handlers. Errors become sysexits-style exit codes.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use surfmgr_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command.as_ref() else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    // Bootstrap the CLI context (composition root)
    let ctx = bootstrap(CliConfig::from_cli(&cli))?;

    match command {
        Commands::Status { target } => handlers::status::execute(&ctx, target)?,
        Commands::Kill {
            target,
            pid,
            timeout,
        } => handlers::process::kill(&ctx, target, *pid, *timeout).await?,
        Commands::Close {
            target,
            timeout,
            retries,
        } => handlers::process::close(&ctx, target, *timeout, *retries).await?,
        Commands::Wait { target, timeout } => {
            handlers::process::wait(&ctx, target, *timeout).await?;
        }
        Commands::Backup {
            profile,
            session,
            skip_close,
        } => handlers::transfer::backup(&ctx, profile, session, *skip_close).await?,
        Commands::Restore {
            profile,
            session,
            account_only,
            skip_close,
        } => {
            if *account_only {
                handlers::transfer::restore_account(&ctx, profile, session, *skip_close).await?;
            } else {
                handlers::transfer::restore(&ctx, profile, session, *skip_close).await?;
            }
        }
        Commands::Reset {
            profile,
            no_auto_backup,
            skip_close,
            yes,
        } => handlers::transfer::reset(&ctx, profile, !*no_auto_backup, *skip_close, *yes).await?,
        Commands::NewId { profile, skip_close } => {
            handlers::transfer::new_id(&ctx, profile, *skip_close).await?;
        }
        Commands::Sessions { command } => handlers::sessions::execute(&ctx, command)?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before clap reads SURFMGR_*
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
