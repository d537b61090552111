//! Turning finalized argument vectors into connected, running processes.
//!
//! For N stages the orchestrator allocates N-1 pipes up front, forks one child
//! per stage, closes every pipe end in the parent once all children exist and
//! then blocks until all N children have been reaped. Inside each child the
//! pipe ends it needs are duplicated onto stdin/stdout and every original pipe
//! descriptor is closed before globbing, redirection and `execvp`.

use crate::config::{Config, Limits, NoMatchPolicy, RedirectConfig};
use crate::error::{PipelineError, StageError};
use crate::expand;
use crate::logging::stage_diagnostic;
use crate::redirect;
use crate::signals;
use crate::tokenize::{self, ArgVector};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, fork, ForkResult, Pid};
use std::ffi::CString;
use std::os::fd::{AsRawFd, OwnedFd};

// -------- Parsing --------

/// Stages of one command line, each already split into arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<ArgVector>,
}

impl Pipeline {
    /// `Ok(None)` for a blank line. Nothing is spawned for a line that fails here.
    pub fn parse(line: &str, limits: &Limits) -> Result<Option<Pipeline>, PipelineError> {
        if line.chars().all(|c| c == tokenize::ARG_DELIM) {
            return Ok(None);
        }
        let texts = tokenize::split_pipeline(line);
        if texts.is_empty() {
            return Err(PipelineError::EmptyStage(1));
        }
        if texts.len() > limits.max_stages {
            return Err(PipelineError::TooManyStages { stages: texts.len(), limit: limits.max_stages });
        }
        let mut stages = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            let argv = tokenize::parse_args(text);
            if argv.is_empty() {
                return Err(PipelineError::EmptyStage(i + 1));
            }
            if argv.len() > limits.max_args {
                return Err(PipelineError::TooManyArgs { stage: i + 1, count: argv.len(), limit: limits.max_args });
            }
            stages.push(argv);
        }
        Ok(Some(Pipeline { stages }))
    }

    pub fn stages(&self) -> &[ArgVector] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

// -------- Pipes --------

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    let (read, write) = unistd::pipe()?;
    for fd in [&read, &write] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read, write))
}

/// The N-1 `(read, write)` pipes of an N-stage pipeline. Dropping the set closes every end.
#[derive(Debug)]
pub struct PipeSet {
    pipes: Vec<(OwnedFd, OwnedFd)>,
}

impl PipeSet {
    pub fn allocate(count: usize) -> Result<Self, PipelineError> {
        let mut pipes = Vec::with_capacity(count);
        for _ in 0..count {
            pipes.push(cloexec_pipe().map_err(PipelineError::Pipe)?);
        }
        Ok(PipeSet { pipes })
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Child side: stdin from pipe `index-1`, stdout to pipe `index`, then close all originals.
    fn bind(self, index: usize) -> nix::Result<()> {
        if index > 0 {
            let (read, _) = &self.pipes[index - 1];
            unistd::dup2(read.as_raw_fd(), libc::STDIN_FILENO)?;
        }
        if index < self.pipes.len() {
            let (_, write) = &self.pipes[index];
            unistd::dup2(write.as_raw_fd(), libc::STDOUT_FILENO)?;
        }
        drop(self);
        Ok(())
    }
}

// -------- Stages --------

/// Settings every child applies between fork and exec.
#[derive(Debug, Clone)]
pub struct StageOptions {
    pub glob_no_match: NoMatchPolicy,
    pub max_args: usize,
    pub redirect: RedirectConfig,
}

impl Default for StageOptions {
    fn default() -> Self {
        StageOptions::from(&Config::default())
    }
}

impl From<&Config> for StageOptions {
    fn from(config: &Config) -> Self {
        StageOptions {
            glob_no_match: config.policy.glob_no_match,
            max_args: config.limits.max_args,
            redirect: config.redirect,
        }
    }
}

/// Returns only when there is nothing to execute or a step failed; a successful exec never returns.
fn exec_stage(index: usize, pipes: PipeSet, argv: &[String], opts: &StageOptions) -> Result<(), StageError> {
    if let Err(e) = signals::restore_defaults() {
        stage_diagnostic(&format!("stage {index}: restoring signal dispositions: {e}"));
    }
    pipes.bind(index).map_err(StageError::Wire)?;
    let argv = expand::expand_globs(argv, opts.glob_no_match, opts.max_args)?;
    let argv = redirect::resolve_redirection(&argv, &opts.redirect)?;
    if argv.is_empty() {
        return Ok(());
    }
    let cargs = argv
        .iter()
        .map(|a| CString::new(a.as_str()).map_err(|_| StageError::Nul(a.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    match unistd::execvp(&cargs[0], &cargs) {
        Ok(never) => match never {},
        Err(source) => Err(StageError::Exec { program: argv[0].clone(), source }),
    }
}

fn run_stage(index: usize, pipes: PipeSet, argv: &[String], opts: &StageOptions) -> ! {
    let code = match exec_stage(index, pipes, argv, opts) {
        Ok(()) => 0,
        Err(e) => {
            stage_diagnostic(&e.to_string());
            e.exit_code()
        }
    };
    // SAFETY: skips atexit handlers and stdio flushing, which belong to the parent.
    unsafe { libc::_exit(code) }
}

// -------- Orchestration --------

/// What one pipeline run consumed. Exit statuses are not attributed to stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    pub stages: usize,
    pub pipes: usize,
    pub reaped: usize,
}

fn reap(children: &[Pid]) -> usize {
    let mut reaped = 0;
    for &pid in children {
        loop {
            match waitpid(pid, None) {
                Ok(WaitStatus::Exited(pid, code)) => {
                    log::debug!("pid {pid} exited with {code}");
                    reaped += 1;
                    break;
                }
                Ok(WaitStatus::Signaled(pid, sig, _)) => {
                    log::debug!("pid {pid} killed by {sig:?}");
                    reaped += 1;
                    break;
                }
                Ok(other) => log::trace!("pid {pid}: {other:?}"),
                Err(nix::Error::EINTR) => {}
                Err(e) => {
                    eprintln!("smsh-rs: wait {pid}: {e}");
                    break;
                }
            }
        }
    }
    reaped
}

/// Launch every stage with its stdin/stdout chained to its neighbours and wait for all of them.
///
/// A failure inside a stage only terminates that stage. A pipe or fork failure
/// is returned to the caller after the pipes are closed and the children
/// already started have been reaped.
pub fn run_pipeline(stages: &[ArgVector], opts: &StageOptions) -> Result<PipelineReport, PipelineError> {
    let pipes = PipeSet::allocate(stages.len().saturating_sub(1))?;
    let pipe_count = pipes.len();
    log::debug!("{} stage(s), {pipe_count} pipe(s) allocated", stages.len());

    let mut children = Vec::with_capacity(stages.len());
    for (index, argv) in stages.iter().enumerate() {
        // SAFETY: the child only rewires descriptors, opens files and execs or exits.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => run_stage(index, pipes, argv, opts),
            Ok(ForkResult::Parent { child }) => {
                log::debug!("stage {index} ({}) spawned as pid {child}", argv.first().map_or("", String::as_str));
                children.push(child);
            }
            Err(e) => {
                drop(pipes);
                let reaped = reap(&children);
                log::warn!("fork failed after {reaped} stage(s) were started");
                return Err(PipelineError::Fork(e));
            }
        }
    }
    drop(pipes);

    let reaped = reap(&children);
    Ok(PipelineReport { stages: stages.len(), pipes: pipe_count, reaped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_stages: usize, max_args: usize) -> Limits {
        Limits { max_stages, max_args }
    }

    #[test]
    fn parse_three_stages() {
        let p = Pipeline::parse("cat file.txt | grep foo | wc -l", &Limits::default()).unwrap().unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p.stages()[0], ["cat", "file.txt"]);
        assert_eq!(p.stages()[1], ["grep", "foo"]);
        assert_eq!(p.stages()[2], ["wc", "-l"]);
    }

    #[test]
    fn parse_blank_line() {
        assert_eq!(Pipeline::parse("", &Limits::default()).unwrap(), None);
        assert_eq!(Pipeline::parse("    ", &Limits::default()).unwrap(), None);
    }

    #[test]
    fn parse_rejects_empty_stage() {
        let err = Pipeline::parse("ls |   | wc", &Limits::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyStage(2)));
        assert!(matches!(Pipeline::parse("|", &Limits::default()).unwrap_err(), PipelineError::EmptyStage(1)));
    }

    #[test]
    fn parse_enforces_limits() {
        let err = Pipeline::parse("a | b | c", &limits(2, 10)).unwrap_err();
        assert!(matches!(err, PipelineError::TooManyStages { stages: 3, limit: 2 }));
        let err = Pipeline::parse("echo a b c", &limits(10, 3)).unwrap_err();
        assert!(matches!(err, PipelineError::TooManyArgs { stage: 1, count: 4, limit: 3 }));
    }

    #[test]
    fn pipe_set_size() {
        assert_eq!(PipeSet::allocate(0).unwrap().len(), 0);
        assert_eq!(PipeSet::allocate(3).unwrap().len(), 3);
    }

    #[test]
    fn stage_options_follow_config() {
        let mut config = Config::default();
        config.policy.glob_no_match = NoMatchPolicy::Literal;
        config.limits.max_args = 7;
        let opts = StageOptions::from(&config);
        assert_eq!(opts.glob_no_match, NoMatchPolicy::Literal);
        assert_eq!(opts.max_args, 7);
    }
}
