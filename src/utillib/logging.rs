//! Minimal leveled logging to stderr. Every line is prefixed with a
//! local RFC 3339 timestamp and the source location of the log
//! statement.

use std::{
    io::{StderrLock, Write, stderr},
    sync::atomic::{AtomicU8, Ordering},
};

use anyhow::{Result, bail};
use chrono::{Local, SecondsFormat};

pub fn write_time(file: &str, line: u32, column: u32) -> StderrLock<'static> {
    let t_str = Local::now().to_rfc3339_opts(SecondsFormat::Millis, false);
    let mut lock = stderr().lock();
    write!(&mut lock, "{t_str}\t{file}:{line}:{column}\t").expect("stderr must not fail");
    lock
}

/// Shared body of the level macros, not meant to be used directly.
#[macro_export]
macro_rules! log_at {
    { $level:ident, $($arg:tt)* } => {
        if $crate::utillib::logging::log_level()
            >= $crate::utillib::logging::LogLevel::$level
        {
            use std::io::Write;
            let mut lock = $crate::utillib::logging::write_time(file!(), line!(), column!());
            writeln!(&mut lock, $($arg)*).expect("stderr must not fail");
        }
    }
}

#[macro_export]
macro_rules! warn {
    { $($arg:tt)* } => { $crate::log_at!(Warn, $($arg)*) }
}

#[macro_export]
macro_rules! info {
    { $($arg:tt)* } => { $crate::log_at!(Info, $($arg)*) }
}

#[macro_export]
macro_rules! debug {
    { $($arg:tt)* } => { $crate::log_at!(Debug, $($arg)*) }
}

// Fields stay private so that the only way out is `TryFrom`.
#[derive(Debug, Clone, clap::Args)]
pub struct LogLevelOpt {
    /// Report which files were found and what is being computed
    #[arg(short, long)]
    verbose: bool,

    /// Show information that helps debug this program (implies
    /// `--verbose`)
    #[arg(short, long)]
    debug: bool,

    /// Disable warnings. Conflicts with `--verbose` and `--debug`.
    #[arg(short, long)]
    quiet: bool,
}

impl TryFrom<LogLevelOpt> for LogLevel {
    type Error = anyhow::Error;

    fn try_from(value: LogLevelOpt) -> Result<Self> {
        let LogLevelOpt {
            verbose,
            debug,
            quiet,
        } = value;
        if quiet {
            if verbose || debug {
                bail!("option `--quiet` conflicts with the options `--verbose` and `--debug`")
            }
            return Ok(LogLevel::Quiet);
        }
        Ok(if debug {
            LogLevel::Debug
        } else if verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Do not log anything
    Quiet = 0,
    /// The default, only `warn!` statements produce output
    Warn = 1,
    /// Tell the user what the pipeline is doing
    Info = 2,
    /// Everything, for debugging this program
    Debug = 3,
}

impl LogLevel {
    fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(LogLevel::Quiet),
            1 => Some(LogLevel::Warn),
            2 => Some(LogLevel::Info),
            3 => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

static LOGLEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);

pub fn set_log_level(val: LogLevel) {
    LOGLEVEL.store(val as u8, Ordering::Relaxed);
}

#[inline]
pub fn log_level() -> LogLevel {
    let level = LOGLEVEL.load(Ordering::Relaxed);
    LogLevel::from_level(level).expect("only valid levels are ever stored")
}
