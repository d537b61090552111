//! `<` and `>` handling for a single stage.
//!
//! Operator and file name are removed from the argument vector and the
//! remaining arguments are compacted, so `echo > out.txt hi` runs `echo hi`.

use crate::config::RedirectConfig;
use crate::error::RedirectionError;
use crate::tokenize::ArgVector;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn operator(self) -> &'static str {
        match self {
            Direction::Input => "<",
            Direction::Output => ">",
        }
    }

    fn target_fd(self) -> i32 {
        match self {
            Direction::Input => libc::STDIN_FILENO,
            Direction::Output => libc::STDOUT_FILENO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub direction: Direction,
    pub path: PathBuf,
}

impl Redirection {
    pub fn open(&self, opts: &RedirectConfig) -> Result<File, RedirectionError> {
        let mut oopt = OpenOptions::new();
        match self.direction {
            Direction::Input => oopt.read(true),
            Direction::Output => oopt.write(true).create(true).truncate(opts.truncate).mode(opts.file_mode),
        };
        oopt.open(&self.path).map_err(|source| RedirectionError::Open { path: self.path.clone(), source })
    }

    /// Rebind this process's stdin or stdout to the file. The opened descriptor is closed afterwards.
    pub fn apply(&self, opts: &RedirectConfig) -> Result<(), RedirectionError> {
        let file = self.open(opts)?;
        nix::unistd::dup2(file.as_raw_fd(), self.direction.target_fd()).map_err(RedirectionError::Dup)?;
        Ok(())
    }
}

/// Arguments with redirections taken out, plus the redirections in the order written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub argv: ArgVector,
    pub redirections: Vec<Redirection>,
}

fn direction_of(arg: &str) -> Option<Direction> {
    match arg {
        "<" => Some(Direction::Input),
        ">" => Some(Direction::Output),
        _ => None,
    }
}

/// Side-effect free half of resolution.
pub fn plan(args: &[String]) -> Result<Resolved, RedirectionError> {
    let mut resolved = Resolved::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match direction_of(arg) {
            Some(direction) => {
                let target = iter.next().ok_or(RedirectionError::MissingTarget(direction.operator()))?;
                resolved.redirections.push(Redirection { direction, path: PathBuf::from(target) });
            }
            None => resolved.argv.push(arg.clone()),
        }
    }
    Ok(resolved)
}

/// Apply every redirection in `args` to the calling process and return the remaining arguments.
/// Later redirections of the same stream win.
pub fn resolve_redirection(args: &[String], opts: &RedirectConfig) -> Result<ArgVector, RedirectionError> {
    let resolved = plan(args)?;
    for redirection in &resolved.redirections {
        redirection.apply(opts)?;
    }
    Ok(resolved.argv)
}
