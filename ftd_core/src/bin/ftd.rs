use ftd_core::config::ConnectionConfig;
use ftd_core::connection::Connection;
use ftd_core::error::{Error, ErrorKind, Result};
use ftd_core::logger;
use ftd_core::model::ModelRegistry;
use ftd_core::modules::ModuleContext;
use ftd_core::task::{Tasks, exec_tasks, parse_file, validate_tasks};

use std::error::Error as StdError;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::process::exit;

use clap::{ArgAction, Parser, crate_authors, crate_description, crate_version};

#[macro_use]
extern crate log;

const LOG_LEVEL_ENV: &str = "FTD_LOG_LEVEL";

#[derive(Parser, Debug)]
#[command(
    name="ftd",
    about = crate_description!(),
    version = crate_version!(),
    author = crate_authors!("\n"),
)]
struct Args {
    /// Connection config file (hostname, credentials, models)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Execute in dry-run mode without modifications
    #[arg(long)]
    check: bool,
    /// Verbose mode (-vv for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Tasks file to be executed
    tasks_file: PathBuf,
}

/// Trace all errors recursively
fn trace_all(e: &dyn StdError) {
    trace!(target: "error", "{e}");
    if let Some(source_error) = e.source() {
        trace_all(source_error)
    }
}

/// End the program with failure, printing [`Error`].
fn crash_error(e: Error) -> ! {
    error!("{e}");
    if let Some(inner_error) = e.into_inner()
        && let Some(source_error) = inner_error.source()
    {
        trace_all(source_error)
    }
    exit(1)
}

fn read_tasks(path: &Path) -> Result<Tasks> {
    trace!("reading tasks from: {path:?}");
    let content = read_to_string(path).map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!("cannot read {}: {e}", path.display()),
        )
    })?;
    parse_file(&content)
}

fn run(args: &Args) -> Result<()> {
    let tasks = read_tasks(&args.tasks_file)?;
    let config = ConnectionConfig::load(args.config.as_deref(), std::env::vars())?;
    trace!("{config:?}");
    let registry = ModelRegistry::with_models(&config.models);
    validate_tasks(&tasks, &registry)?;

    let connection = Connection::login(&config)?;
    let context = ModuleContext {
        connection: &connection,
        registry: &registry,
        page_size: config.page_size,
        check_mode: args.check,
    };
    let result = exec_tasks(&tasks, &context);
    let hostname = connection.hostname().to_owned();

    if let Err(e) = connection.logout() {
        warn!("logout failed: {e}");
    }
    let changed = result?;
    info!("{hostname}: {} tasks, {changed} changed", tasks.len());
    Ok(())
}

fn main() {
    let args: Args = Args::parse();

    let verbose = logger::verbosity_from_env(
        args.verbose,
        std::env::var(LOG_LEVEL_ENV).ok().as_deref(),
    );
    if let Err(e) = logger::setup_logging(verbose) {
        eprintln!("failed to initialize logging: {e}");
        exit(1);
    }
    trace!("start logger");
    trace!("{:?}", &args);

    if let Err(e) = run(&args) {
        crash_error(e)
    }
}
