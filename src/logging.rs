use anyhow::{Context, Result};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use std::fs::OpenOptions;
use std::path::Path;

/// `-v` count to level: warn, info, debug, then trace.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Log to stderr, or append to `log_file` when given.
pub fn init(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
    let level = level_for(verbosity);
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            WriteLogger::init(level, config, file)?;
        }
        None => TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto)?,
    }
    Ok(())
}

/// One `smsh-rs: ` prefixed line on fd 2 through a single `write(2)`.
///
/// Forked stages report through this instead of `eprintln!` or the logger:
/// both take a lock that another thread of the parent may have held at fork time.
pub fn stage_diagnostic(msg: &str) {
    let line = format!("smsh-rs: {msg}\n");
    // SAFETY: the buffer is valid for `line.len()` bytes for the whole call.
    let _ = unsafe { libc::write(libc::STDERR_FILENO, line.as_ptr().cast(), line.len()) };
}
