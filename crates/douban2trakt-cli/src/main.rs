use clap::{ArgAction, Parser, Subcommand};
use history_sync_models::SyncMode;
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

use commands::{auth, config, export, refine, run, sync};

#[derive(Parser)]
#[command(name = "douban2trakt")]
#[command(about = "Move your Douban watch history to Trakt")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Also write logs to this file (rotated daily)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve scraped rows and write the manual-review CSV
    #[command(long_about = "Classify every scraped row, resolve its watch time from the interest feed, the page date and optionally a deep per-subject fetch, match it against the Trakt catalog, and write the result to a CSV you can review and fix by hand before syncing.")]
    Export {
        /// Scraped rows (title,date,douban_link[,type,season])
        #[arg(long, value_name = "CSV")]
        input: PathBuf,

        /// Where to write the review CSV
        #[arg(long, value_name = "CSV", default_value = "movie.csv")]
        out: PathBuf,

        /// Douban user id for the interest feed (overrides config)
        #[arg(long)]
        user_id: Option<String>,

        /// Skip rows dated on or before this day (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        since: Option<chrono::NaiveDate>,

        /// Fetch per-subject detail for rows that only have a page date
        #[arg(long, action = ArgAction::SetTrue)]
        deep_refine: bool,

        /// Only deep-refine rows from the last N days
        #[arg(long, value_name = "DAYS")]
        deep_refine_window: Option<i64>,

        /// Pull every interest status, not just the configured ones
        #[arg(long, action = ArgAction::SetTrue)]
        all_statuses: bool,

        /// Trakt client id (overrides TRAKT_CLIENT_ID and config)
        #[arg(long)]
        trakt_client_id: Option<String>,
    },
    /// Send a reviewed CSV to Trakt
    #[command(long_about = "Read a review CSV produced by `export` (or `refine`), group matched rows into movie, season and whole-show entries, and post them to Trakt history or watchlist in batches.")]
    Sync {
        /// Review CSV to send
        #[arg(long, value_name = "CSV", default_value = "movie.csv")]
        csv: PathBuf,

        /// Where to write: watched history or watchlist (defaults to config)
        #[arg(long, value_parser = parse_mode)]
        mode: Option<SyncMode>,

        /// Trakt client id (overrides TRAKT_CLIENT_ID and config)
        #[arg(long)]
        trakt_client_id: Option<String>,

        /// Trakt access token (overrides TRAKT_ACCESS_TOKEN and stored credentials)
        #[arg(long)]
        trakt_token: Option<String>,

        /// Entries per request (defaults to config)
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,

        /// Print the payloads instead of sending them
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Improve watch times in an existing review CSV
    #[command(long_about = "Re-run watch time resolution over an existing review CSV. Only the datetime column is rewritten; hand edits in every other column are kept. With --only-missing, only rows without a time or with a day-only time are looked at.")]
    Refine {
        /// Review CSV to read
        #[arg(long = "in", value_name = "CSV")]
        input: PathBuf,

        /// Where to write the refined CSV
        #[arg(long, value_name = "CSV")]
        out: PathBuf,

        /// Douban user id for the interest feed (overrides config)
        #[arg(long)]
        user_id: Option<String>,

        /// Only refine rows without a precise time
        #[arg(long, action = ArgAction::SetTrue)]
        only_missing: bool,

        /// Fetch per-subject detail for rows that only have a page date
        #[arg(long, action = ArgAction::SetTrue)]
        deep_refine: bool,

        /// Stop after this many rows were updated
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Keep a copy of the input as <in>.bak when refining in place
        #[arg(long, action = ArgAction::SetTrue)]
        backup: bool,
    },
    /// Authorize, export and sync in one go
    #[command(long_about = "Run the whole migration: authorize with Trakt when no usable token is stored, export the scraped rows to the review CSV, then sync that file. Asks for confirmation first unless --yes is given.")]
    Run {
        /// Scraped rows (title,date,douban_link[,type,season])
        #[arg(long, value_name = "CSV")]
        input: PathBuf,

        /// Where to write the review CSV
        #[arg(long, value_name = "CSV", default_value = "movie.csv")]
        out: PathBuf,

        /// Douban user id for the interest feed (overrides config)
        #[arg(long)]
        user_id: Option<String>,

        /// Skip rows dated on or before this day (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        since: Option<chrono::NaiveDate>,

        /// Fetch per-subject detail for rows that only have a page date
        #[arg(long, action = ArgAction::SetTrue)]
        deep_refine: bool,

        /// Only deep-refine rows from the last N days
        #[arg(long, value_name = "DAYS")]
        deep_refine_window: Option<i64>,

        /// Pull every interest status, not just the configured ones
        #[arg(long, action = ArgAction::SetTrue)]
        all_statuses: bool,

        /// Where to write: watched history or watchlist (defaults to config)
        #[arg(long, value_parser = parse_mode)]
        mode: Option<SyncMode>,

        /// Trakt client id (overrides TRAKT_CLIENT_ID and config)
        #[arg(long)]
        trakt_client_id: Option<String>,

        /// Entries per request (defaults to config)
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,

        /// Export as usual but only print the sync payloads
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,

        /// Don't ask for confirmation
        #[arg(short, long, action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// Authorize with Trakt using a device code
    #[command(long_about = "Authorize this tool with Trakt. You'll need a Trakt API application (https://trakt.tv/oauth/applications). A code is shown that you enter on the Trakt website; the resulting token is saved to the credentials file.")]
    Auth {
        /// Trakt Client ID (if not provided, uses config or prompts)
        #[arg(long)]
        client_id: Option<String>,

        /// Trakt Client Secret (if not provided, uses config or prompts)
        #[arg(long)]
        client_secret: Option<String>,
    },
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    Show {
        /// Show full configuration including masked secrets
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

fn parse_mode(s: &str) -> Result<SyncMode, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging_with_file(cli.verbose, cli.quiet, cli.log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Export {
            input,
            out,
            user_id,
            since,
            deep_refine,
            deep_refine_window,
            all_statuses,
            trakt_client_id,
        } => {
            let args = export::ExportArgs {
                input,
                out,
                user_id,
                since,
                deep_refine,
                deep_refine_window,
                all_statuses,
                trakt_client_id,
            };
            export::run_export(args, &output).await
        }
        Commands::Sync {
            csv,
            mode,
            trakt_client_id,
            trakt_token,
            batch_size,
            dry_run,
        } => {
            let args = sync::SyncArgs {
                csv,
                mode,
                trakt_client_id,
                trakt_token,
                batch_size,
                dry_run,
            };
            sync::run_sync(args, &output).await
        }
        Commands::Refine {
            input,
            out,
            user_id,
            only_missing,
            deep_refine,
            limit,
            backup,
        } => {
            let args = refine::RefineArgs {
                input,
                out,
                user_id,
                only_missing,
                deep_refine,
                limit,
                backup,
            };
            refine::run_refine(args, &output).await
        }
        Commands::Run {
            input,
            out,
            user_id,
            since,
            deep_refine,
            deep_refine_window,
            all_statuses,
            mode,
            trakt_client_id,
            batch_size,
            dry_run,
            yes,
        } => {
            let args = run::RunArgs {
                input,
                out,
                user_id,
                since,
                deep_refine,
                deep_refine_window,
                all_statuses,
                mode,
                trakt_client_id,
                batch_size,
                dry_run,
                yes,
            };
            run::run_workflow(args, &output).await
        }
        Commands::Auth {
            client_id,
            client_secret,
        } => auth::run_auth(client_id, client_secret, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, &output),
    }
}
