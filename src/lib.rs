//! smsh: a small line-oriented command interpreter.
//!
//! One input line becomes a process topology: the line is split on `|` into
//! stages, each stage is split on spaces into arguments, and every stage runs
//! as its own process with its stdin/stdout chained to its neighbours through
//! pipes. Inside each child, wildcard arguments are expanded and `<` / `>`
//! redirections are applied before the program image is replaced.
//!
//! - [`tokenize`]: single-character tokenizer, pipeline splitter, argument parser.
//! - [`expand`]: `*` / `?` expansion against the filesystem.
//! - [`redirect`]: `<` / `>` detection and stream rebinding.
//! - [`pipeline`]: pipe allocation, fork/exec of each stage, reaping.
//! - [`shell`]: interpreter context and read-execute loop.

pub mod config;
pub mod error;
pub mod expand;
pub mod logging;
pub mod pipeline;
pub mod reader;
pub mod redirect;
pub mod shell;
pub mod signals;
pub mod tokenize;

pub use config::Config;
pub use pipeline::{run_pipeline, Pipeline, PipelineReport, StageOptions};
pub use shell::Shell;
