use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while preparing or launching a whole pipeline (parent side).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipe: {0}")]
    Pipe(#[source] nix::Error),
    #[error("fork: {0}")]
    Fork(#[source] nix::Error),
    #[error("pipeline has {stages} stages, limit is {limit}")]
    TooManyStages { stages: usize, limit: usize },
    #[error("stage {stage} has {count} arguments, limit is {limit}")]
    TooManyArgs { stage: usize, count: usize, limit: usize },
    #[error("empty command in stage {0}")]
    EmptyStage(usize),
}

impl PipelineError {
    /// Pipe or process allocation failed: the host is out of basic OS resources.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, PipelineError::Pipe(_) | PipelineError::Fork(_))
    }
}

#[derive(Debug, Error)]
pub enum RedirectionError {
    #[error("missing file name after `{0}`")]
    MissingTarget(&'static str),
    #[error("open {}: {source}", .path.display())]
    Open { path: PathBuf, #[source] source: io::Error },
    #[error("dup2: {0}")]
    Dup(#[source] nix::Error),
}

#[derive(Debug, Error)]
pub enum GlobError {
    #[error("glob expansion produced {count} arguments, limit is {limit}")]
    TooManyArgs { count: usize, limit: usize },
}

/// Failures inside a forked stage before its program image is replaced.
/// Each one terminates only that child.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("wiring pipe: {0}")]
    Wire(#[source] nix::Error),
    #[error(transparent)]
    Glob(#[from] GlobError),
    #[error(transparent)]
    Redirect(#[from] RedirectionError),
    #[error("argument contains a NUL byte: {0:?}")]
    Nul(String),
    #[error("exec {program}: {source}")]
    Exec { program: String, #[source] source: nix::Error },
}

impl StageError {
    pub fn exit_code(&self) -> i32 {
        match self {
            StageError::Exec { source: nix::Error::ENOENT, .. } => 127,
            StageError::Exec { .. } => 126,
            _ => 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {}: {source}", .path.display())]
    Read { path: PathBuf, #[source] source: io::Error },
    #[error("parsing config {}: {source}", .path.display())]
    Parse { path: PathBuf, #[source] source: toml::de::Error },
}
