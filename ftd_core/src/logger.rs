use crate::error::{Error, ErrorKind, Result};

use std::fmt;
use std::io;

use console::Term;
use fern::FormatCallback;
use fern::colors::Color;

const DEFAULT_TERM_WIDTH: usize = 80;

fn log_format(out: FormatCallback, message: &fmt::Arguments, record: &log::Record) {
    let log_header = match (record.level(), record.target()) {
        (log::Level::Info, "ok") => "ok: ".to_owned(),
        (log::Level::Info, "changed") => "changed: ".to_owned(),
        (log::Level::Warn, _) => "[WARNING] ".to_owned(),
        (log::Level::Error, "task") => "failed: ".to_owned(),
        (log::Level::Error, _) => "[ERROR] ".to_owned(),
        (log::Level::Info, "task") => "TASK ".to_owned(),
        (log::Level::Info, _) => "".to_owned(),
        (log::Level::Debug, _) => "".to_owned(),
        (log::Level::Trace, s) => s.to_owned() + " - ",
    };
    let message = message.to_string();
    let separator = match (record.level(), record.target()) {
        (log::Level::Info, "task") => {
            let width = Term::stdout()
                .size_checked()
                .map(|(_, w)| w as usize)
                .unwrap_or(DEFAULT_TERM_WIDTH);
            "*".repeat(width.saturating_sub(log_header.len() + message.len()))
        }
        (_, _) => "".to_owned(),
    };
    out.finish(format_args!(
        "{color_line}{log_header}{message}{separator}\x1B[0m",
        color_line = format_args!(
            "\x1B[{}m",
            match (record.level(), record.target()) {
                (log::Level::Trace, "error") => Color::Red,
                (log::Level::Trace, _) => Color::BrightBlack,
                (log::Level::Debug, _) => Color::BrightBlue,
                (log::Level::Info, "changed") => Color::Yellow,
                (log::Level::Info, "ok") => Color::Green,
                (log::Level::Info, _) => Color::White,
                (log::Level::Warn, _) => Color::Magenta,
                (log::Level::Error, _) => Color::Red,
            }
            .to_fg_str()
        ),
    ))
}

fn level_filter(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Verbosity from `FTD_LOG_LEVEL` when no `-v` flag was passed.
pub fn verbosity_from_env(flag_verbosity: u8, env_level: Option<&str>) -> u8 {
    if flag_verbosity != 0 {
        return flag_verbosity;
    }
    match env_level {
        Some("DEBUG") => 1,
        Some("TRACE") => 2,
        _ => 0,
    }
}

/// Setup logging in function of verbosity.
///
/// Errors go to stderr, everything else to stdout.
pub fn setup_logging(verbosity: u8) -> Result<()> {
    let base_config = fern::Dispatch::new()
        .level(level_filter(verbosity))
        // reqwest and rustls are too chatty even at debug
        .level_for("reqwest", log::LevelFilter::Warn)
        .level_for("rustls", log::LevelFilter::Warn);

    let stdout_config = fern::Dispatch::new()
        .format(log_format)
        .filter(|metadata| metadata.level() > log::Level::Error)
        .chain(io::stdout());

    let stderr_config = fern::Dispatch::new()
        .format(log_format)
        .level(log::LevelFilter::Error)
        .chain(io::stderr());

    base_config
        .chain(stdout_config)
        .chain(stderr_config)
        .apply()
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;

    Ok(())
}
